//! PAM policy editing use case

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::enrollment::Credential;
use crate::config::ProvisionConfig;
use crate::error::{EnrollmentError, FilesystemError, ProvisionError, ProvisionResult};
use crate::logic::{insert_requirement, is_configured, requirement_line, stale_entries};
use crate::model::StepStatus;
use crate::ports::FileStore;

/// Edits one PAM policy file so it requires the hardware key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PamStackEditor {
    policy: PathBuf,
    backup: PathBuf,
    anchors: Vec<String>,
    required: String,
}

impl PamStackEditor {
    /// Editor for the configured policy, requiring the credential at `authfile`
    pub fn new(config: &ProvisionConfig, authfile: &Path) -> Self {
        Self {
            policy: config.pam_policy.clone(),
            backup: config.pam_backup(),
            anchors: config.pam_anchors.clone(),
            required: requirement_line(authfile),
        }
    }

    pub fn required_line(&self) -> &str {
        &self.required
    }

    fn read_policy<H: FileStore>(&self, host: &H) -> ProvisionResult<(String, u32)> {
        let contents = host.read(&self.policy)?.ok_or_else(|| {
            FilesystemError::new(
                "read",
                &self.policy,
                io::Error::from(io::ErrorKind::NotFound),
            )
        })?;
        let mode = host
            .metadata(&self.policy)?
            .map(|info| info.mode & 0o7777)
            .unwrap_or(0o644);
        // A lossy decode would rewrite any non-UTF-8 bytes on the next write
        let policy = String::from_utf8(contents).map_err(|err| {
            FilesystemError::new(
                "decode",
                &self.policy,
                io::Error::new(io::ErrorKind::InvalidData, err),
            )
        })?;
        Ok((policy, mode))
    }

    /// Whether the requirement line is already present
    pub fn is_configured<H: FileStore>(&self, host: &H) -> ProvisionResult<bool> {
        let (policy, _) = self.read_policy(host)?;
        Ok(is_configured(&policy, &self.required))
    }

    /// Copy the policy to its backup unless a backup already exists
    ///
    /// The first backup is the one worth keeping: later runs would only
    /// copy an already edited file over it.
    pub fn ensure_backup<H: FileStore>(&self, host: &mut H) -> ProvisionResult<StepStatus> {
        if host.exists(&self.backup) {
            info!("Backup {} already exists", self.backup.display());
            return Ok(StepStatus::Skipped);
        }
        let (policy, mode) = self.read_policy(&*host)?;
        host.write_atomic(&self.backup, policy.as_bytes(), mode)?;
        info!("Backed up {} to {}", self.policy.display(), self.backup.display());
        Ok(StepStatus::Applied)
    }

    /// Insert the requirement before the first anchor line
    ///
    /// # Errors
    ///
    /// `CredentialMissing` if the credential file is absent or empty, and
    /// `MissingAnchor` if no anchor line exists, and `FilesystemError` if
    /// the policy is missing or not valid UTF-8. The policy file is not
    /// touched in any of these cases.
    pub fn apply<H: FileStore>(&self, host: &mut H, credential: &Credential) -> ProvisionResult<StepStatus> {
        let (policy, mode) = self.read_policy(&*host)?;
        if is_configured(&policy, &self.required) {
            info!("{} already requires the hardware key", self.policy.display());
            return Ok(StepStatus::Skipped);
        }

        if !credential.is_planned() {
            let stored = host.read(credential.path())?.unwrap_or_default();
            if stored.iter().all(u8::is_ascii_whitespace) {
                return Err(EnrollmentError::CredentialMissing {
                    path: credential.path().to_path_buf(),
                }
                .into());
            }
        }

        let updated = insert_requirement(&policy, &self.required, &self.anchors).ok_or_else(|| {
            ProvisionError::MissingAnchor {
                path: self.policy.clone(),
                anchors: self.anchors.clone(),
            }
        })?;

        let stale = stale_entries(&policy, &self.required);
        if stale > 0 {
            debug!("Dropping {} outdated pam_u2f line(s)", stale);
        }

        host.write_atomic(&self.policy, updated.as_bytes(), mode)?;
        info!("{} now requires the hardware key", self.policy.display());
        Ok(StepStatus::Applied)
    }
}
