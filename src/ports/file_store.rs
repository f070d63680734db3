//! FileStore trait - capability to read and mutate host files

use std::path::Path;

use crate::error::ProvisionResult;
use crate::model::Owner;

/// Facts about an existing path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Permission bits (`0o7777` mask)
    pub mode: u32,
    pub owner: Owner,
    pub len: u64,
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// Capability to read and mutate host files
///
/// Reads never change state. Every mutating method is a single step that
/// either fully happens or does not happen at all.
pub trait FileStore {
    /// Read a whole file, `None` if it does not exist
    fn read(&self, path: &Path) -> ProvisionResult<Option<Vec<u8>>>;

    /// Metadata of a path itself, `None` if it does not exist
    ///
    /// A symbolic link is reported as such, dangling or not; it is never
    /// followed.
    fn metadata(&self, path: &Path) -> ProvisionResult<Option<FileInfo>>;

    fn exists(&self, path: &Path) -> bool {
        matches!(self.metadata(path), Ok(Some(_)))
    }

    /// Replace `path` with `contents`
    ///
    /// The data goes to a temporary file in the same directory, is synced,
    /// and is renamed over `path`. Readers observe either the old or the new
    /// content, never a mix. A symbolic link at `path` is replaced, never written through.
    fn write_atomic(&mut self, path: &Path, contents: &[u8], mode: u32) -> ProvisionResult<()>;

    /// Like `write_atomic`, with the file handed to `owner` before it
    /// becomes visible at `path`
    ///
    /// Mode and owner are applied to the open temporary file, not by path.
    fn write_atomic_owned(
        &mut self,
        path: &Path,
        contents: &[u8],
        mode: u32,
        owner: Owner,
    ) -> ProvisionResult<()>;

    /// Create a directory and any missing parents
    fn create_dir_all(&mut self, path: &Path) -> ProvisionResult<()>;

    /// Change the owner of `path` itself; a symbolic link is not followed
    fn set_owner(&mut self, path: &Path, owner: Owner) -> ProvisionResult<()>;

    /// Remove a file or symbolic link; removing a missing file succeeds
    fn remove_file(&mut self, path: &Path) -> ProvisionResult<()>;
}
