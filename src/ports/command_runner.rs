//! CommandRunner trait - capability to run external programs

use crate::error::ProvisionResult;
use crate::model::{CommandLine, CommandOutput};

/// Capability to run external programs
///
/// The package manager, udev and the enrollment utility are all driven
/// through this one trait, so a dry-run implementation can intercept every
/// one of them.
pub trait CommandRunner {
    /// Run a command to completion
    ///
    /// A non-zero exit status is not an error: callers inspect
    /// [`CommandOutput::status`] and decide whether it is fatal.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Spawn` if the process could not be started.
    fn run(&mut self, command: &CommandLine) -> ProvisionResult<CommandOutput>;

    /// True when mutating commands are only logged, never executed
    fn is_dry_run(&self) -> bool {
        false
    }
}
