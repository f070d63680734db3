use std::path::{Path, PathBuf};

use crate::error::ProvisionResult;
use crate::model::TargetUser;

/// Capability to inspect the running host
pub trait HostProbe {
    fn effective_uid(&self) -> u32;

    /// Real uid of the invoking process
    fn current_uid(&self) -> u32;

    fn lookup_user(&self, name: &str) -> Option<TargetUser>;

    fn user_by_uid(&self, uid: u32) -> Option<TargetUser>;

    /// Sorted entry names of a directory; a missing directory is empty
    fn list_dir(&self, dir: &Path) -> ProvisionResult<Vec<String>>;

    /// Location of an executable on `PATH`
    fn find_tool(&self, name: &str) -> Option<PathBuf>;
}
