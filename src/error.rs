//! Error types for yksudo
//!
//! This module defines the error hierarchy for all provisioning operations.
//! Errors are organized per stage and use thiserror for implementation.
//! Every error is fatal: the run stops, earlier steps keep their state and
//! the operator re-runs after fixing the cause.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for provisioning operations
///
/// This is a convenience alias for `Result<T, ProvisionError>`.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Top-level error type for all provisioning operations
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Not running with the required privilege
    #[error("must run as root (effective uid is {euid}); re-run with sudo")]
    Privilege { euid: u32 },

    /// No hardware key interface visible to this host
    #[error("no device matching {pattern} found - the hardware key is not attached to this host")]
    DeviceNotFound { pattern: String },

    /// Package manager errors
    #[error("package installation failed: {0}")]
    Install(#[from] InstallError),

    /// Key enrollment errors
    #[error("key enrollment failed: {0}")]
    Enrollment(#[from] EnrollmentError),

    /// The policy file has no line the requirement can be ordered before
    #[error("no insertion anchor found in {} (looked for: {})", .path.display(), .anchors.join(", "))]
    MissingAnchor { path: PathBuf, anchors: Vec<String> },

    /// Filesystem errors
    #[error("filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// External command errors
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Target user resolution errors
    #[error("target user error: {0}")]
    User(#[from] UserError),

    /// Invalid configuration values
    #[error("invalid configuration: {0}")]
    Model(#[from] ModelError),
}

impl ProvisionError {
    /// Name of the provisioning stage this error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            ProvisionError::Privilege { .. } | ProvisionError::User(_) => "preflight",
            ProvisionError::DeviceNotFound { .. } => "device check",
            ProvisionError::Install(_) => "package installation",
            ProvisionError::Enrollment(_) => "enrollment",
            ProvisionError::MissingAnchor { .. } => "PAM policy",
            ProvisionError::Filesystem(_) => "filesystem",
            ProvisionError::Command(_) => "external command",
            ProvisionError::Model(_) => "configuration",
        }
    }

    /// Operator-facing remediation for this failure
    pub fn hint(&self) -> &'static str {
        match self {
            ProvisionError::Privilege { .. } => "Run: sudo yksudo",
            ProvisionError::DeviceNotFound { .. } => {
                "On Windows (Admin PowerShell):\n  \
                 usbipd list\n  \
                 usbipd detach --busid <BUSID>\n  \
                 usbipd attach --wsl --distribution Debian --busid <BUSID>\n\
                 After 'wsl --shutdown' the key must be attached again. Then re-run yksudo."
            }
            ProvisionError::Install(_) => {
                "Check network access and apt sources (apt-get update), then re-run."
            }
            ProvisionError::Enrollment(_) => {
                "Common causes:\n  \
                 - key not attached to this distro\n  \
                 - /dev/hidraw* not present or not accessible\n  \
                 - FIDO2 application disabled on the key\n  \
                 - PIN or touch not provided in time\n\
                 The PAM policy was not modified. Fix the cause and re-run."
            }
            ProvisionError::MissingAnchor { .. } => {
                "The sudo PAM policy has an unexpected layout; add the pam_u2f line manually \
                 or restore the distribution default, then re-run."
            }
            ProvisionError::Filesystem(_) => {
                "Check ownership and permissions of the listed path, then re-run."
            }
            ProvisionError::Command(_) => "Install the missing tool, then re-run.",
            ProvisionError::User(_) => "Pass the account to enroll explicitly: sudo yksudo --user <name>",
            ProvisionError::Model(_) => "Fix the configuration value and re-run.",
        }
    }
}

/// Package manager errors
#[derive(Error, Debug)]
pub enum InstallError {
    /// The package manager exited with a failure status
    #[error("`{action}` exited with status {status}: {stderr}")]
    ManagerFailed {
        action: String,
        status: i32,
        stderr: String,
    },
}

/// Enrollment utility errors
#[derive(Error, Debug)]
pub enum EnrollmentError {
    /// The enrollment utility could not be started
    #[error("could not start enrollment utility: {0}")]
    Spawn(#[source] CommandError),

    /// The enrollment utility exited with a failure status
    #[error("enrollment utility exited with status {status}")]
    UtilityFailed { status: i32 },

    /// The enrollment utility succeeded but wrote nothing
    #[error("enrollment utility produced no credential")]
    EmptyOutput,

    /// A credential was expected on disk but is absent or empty
    #[error("credential file {} is missing or empty", .path.display())]
    CredentialMissing { path: PathBuf },
}

/// Filesystem errors (ownership, permissions, atomic replace)
#[derive(Error, Debug)]
#[error("failed to {action} {}: {source}", .path.display())]
pub struct FilesystemError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FilesystemError {
    pub fn new(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// External command errors
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be spawned (usually: program not installed)
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Target user errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    /// No such account in the user database
    #[error("user '{0}' does not exist on this system")]
    NotFound(String),

    /// The only candidate was root, which cannot be the enrolled user
    #[error("could not determine a non-root target user")]
    RootTarget,

    /// The invoking account could not be determined
    #[error("could not determine the invoking user")]
    Unresolved,
}

/// Invalid model values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Package name error
    #[error("package name error: {0}")]
    PackageName(#[from] crate::model::PackageNameError),

    /// Device glob error
    #[error("device pattern error: {0}")]
    DeviceGlob(#[from] crate::model::DeviceGlobError),
}

impl From<crate::model::PackageNameError> for ProvisionError {
    fn from(err: crate::model::PackageNameError) -> Self {
        ProvisionError::Model(ModelError::PackageName(err))
    }
}

impl From<crate::model::DeviceGlobError> for ProvisionError {
    fn from(err: crate::model::DeviceGlobError) -> Self {
        ProvisionError::Model(ModelError::DeviceGlob(err))
    }
}
