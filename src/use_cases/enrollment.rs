//! Key enrollment use case
//!
//! Runs the enrollment utility as the target user and stores its output as
//! the credential file pam_u2f reads. The output is captured in memory and
//! only written once the utility succeeds, so a failed or interrupted
//! enrollment never touches an existing credential.
//!
//! The store lives in a directory the user controls while this runs as
//! root. Symbolic links on the way to the store are refused, and the file
//! itself is created under a fresh name and renamed into place.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{with_extra_suffix, ProvisionConfig};
use crate::error::{EnrollmentError, FilesystemError, ProvisionError, ProvisionResult};
use crate::model::{CommandLine, Owner, StepStatus, TargetUser};
use crate::ports::{CommandRunner, FileStore};

/// Proof that a credential store exists for this run
///
/// Only `ensure_credential` hands these out, and the PAM edit requires one.
/// A planned credential comes from a dry run, where nothing was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    path: PathBuf,
    planned: bool,
}

impl Credential {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_planned(&self) -> bool {
        self.planned
    }
}

/// Directories between the user's home and the store, outermost first
fn store_dirs(home: &Path, store: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = store
        .parent()
        .map(|parent| {
            parent
                .ancestors()
                .take_while(|dir| *dir != home && dir.starts_with(home))
                .map(Path::to_path_buf)
                .collect()
        })
        .unwrap_or_default();
    dirs.reverse();
    dirs
}

fn symlink_refused(path: &Path) -> ProvisionError {
    FilesystemError::new(
        "use",
        path,
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "refusing to follow a symbolic link in the user's home",
        ),
    )
    .into()
}

/// Fail if the store or any directory leading to it is a symbolic link
fn refuse_symlinks<H: FileStore>(host: &H, user: &TargetUser, store: &Path) -> ProvisionResult<()> {
    for path in store_dirs(&user.home, store).iter().map(PathBuf::as_path).chain([store]) {
        if host.metadata(path)?.is_some_and(|info| info.is_symlink) {
            return Err(symlink_refused(path));
        }
    }
    Ok(())
}

/// Create the store's directories and hand them to the target user
fn prepare_store_dirs<H: FileStore>(host: &mut H, user: &TargetUser, store: &Path) -> ProvisionResult<()> {
    let owner = Owner::from(user);
    for dir in store_dirs(&user.home, store) {
        match host.metadata(&dir)? {
            None => {
                debug!("Creating {}", dir.display());
                host.create_dir_all(&dir)?;
                host.set_owner(&dir, owner)?;
            }
            Some(info) if info.is_symlink => return Err(symlink_refused(&dir)),
            Some(info) if info.owner != owner => {
                debug!("Handing {} to {}", dir.display(), user.name);
                host.set_owner(&dir, owner)?;
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Make sure `user` has an enrolled credential
///
/// An existing non-empty store is kept unless `force` is set. Otherwise the
/// enrollment utility runs interactively (PIN and touch prompts reach the
/// operator) and its output replaces the store with mode 0600, owned by
/// the user.
///
/// # Arguments
///
/// * `host` - Host to run on
/// * `user` - Account the credential belongs to
/// * `config` - Store location and enrollment program
/// * `force` - Enroll again even if a credential exists
///
/// # Errors
///
/// Returns `EnrollmentError` if the utility cannot be started, fails or
/// prints nothing; the existing store is then left as it was. A symbolic
/// link on the way to the store, and ownership failures, surface as
/// `FilesystemError`.
pub fn ensure_credential<H: CommandRunner + FileStore>(
    host: &mut H,
    user: &TargetUser,
    config: &ProvisionConfig,
    force: bool,
) -> ProvisionResult<(Credential, StepStatus)> {
    let store = config.credential_path(user);
    refuse_symlinks(host, user, &store)?;

    if !force {
        if let Some(existing) = host.read(&store)? {
            if !existing.iter().all(u8::is_ascii_whitespace) {
                info!("{} is already enrolled ({})", user.name, store.display());
                return Ok((
                    Credential {
                        path: store,
                        planned: false,
                    },
                    StepStatus::Skipped,
                ));
            }
            info!("{} is empty; enrolling again", store.display());
        }
    }

    info!("Enrolling a key for {}; touch the key when it blinks", user.name);
    let command = CommandLine::new(
        "sudo",
        ["-u", user.name.as_str(), "--", config.enrollment_program.as_str()],
    )
    .interactive();

    let output = match host.run(&command) {
        Ok(output) => output,
        Err(ProvisionError::Command(err)) => return Err(EnrollmentError::Spawn(err).into()),
        Err(err) => return Err(err),
    };

    if output.synthetic {
        prepare_store_dirs(host, user, &store)?;
        return Ok((
            Credential {
                path: store,
                planned: true,
            },
            StepStatus::Applied,
        ));
    }

    if !output.success() {
        return Err(EnrollmentError::UtilityFailed {
            status: output.status,
        }
        .into());
    }
    let credential = output.stdout;
    if credential.trim().is_empty() {
        return Err(EnrollmentError::EmptyOutput.into());
    }

    prepare_store_dirs(host, user, &store)?;

    // A leftover temporary store is unlinked, never followed
    let stale = with_extra_suffix(&store, ".tmp");
    if host.metadata(&stale)?.is_some() {
        debug!("Removing stale {}", stale.display());
        host.remove_file(&stale)?;
    }

    host.write_atomic_owned(&store, credential.as_bytes(), 0o600, Owner::from(user))?;

    if !credential.starts_with(&format!("{}:", user.name)) {
        warn!(
            "Credential in {} does not start with '{}:'; pam_u2f will not match it",
            store.display(),
            user.name
        );
    }
    info!("Stored credential in {}", store.display());

    Ok((
        Credential {
            path: store,
            planned: false,
        },
        StepStatus::Applied,
    ))
}
