//! Dry-run wrapper around another host
//!
//! Reads and read-only probes go to the wrapped host so every check sees
//! the real state. Mutations are logged and reported as successful without
//! touching anything.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ProvisionResult;
use crate::model::{CommandLine, CommandOutput, Owner, TargetUser};
use crate::ports::{CommandRunner, FileInfo, FileStore, HostProbe};

#[derive(Debug, Clone, Default)]
pub struct DryRunHost<H> {
    inner: H,
}

impl<H> DryRunHost<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: CommandRunner> CommandRunner for DryRunHost<H> {
    fn run(&mut self, command: &CommandLine) -> ProvisionResult<CommandOutput> {
        if !command.is_mutating() {
            return self.inner.run(command);
        }
        info!("[dry-run] would run: {}", command);
        Ok(CommandOutput::synthetic_success())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

impl<H: FileStore> FileStore for DryRunHost<H> {
    fn read(&self, path: &Path) -> ProvisionResult<Option<Vec<u8>>> {
        self.inner.read(path)
    }

    fn metadata(&self, path: &Path) -> ProvisionResult<Option<FileInfo>> {
        self.inner.metadata(path)
    }

    fn write_atomic(&mut self, path: &Path, contents: &[u8], mode: u32) -> ProvisionResult<()> {
        info!(
            "[dry-run] would write {} ({} bytes, mode {:o})",
            path.display(),
            contents.len(),
            mode
        );
        Ok(())
    }

    fn write_atomic_owned(
        &mut self,
        path: &Path,
        contents: &[u8],
        mode: u32,
        owner: Owner,
    ) -> ProvisionResult<()> {
        info!(
            "[dry-run] would write {} ({} bytes, mode {:o}, owned by {}:{})",
            path.display(),
            contents.len(),
            mode,
            owner.uid,
            owner.gid
        );
        Ok(())
    }

    fn create_dir_all(&mut self, path: &Path) -> ProvisionResult<()> {
        info!("[dry-run] would create directory {}", path.display());
        Ok(())
    }

    fn set_owner(&mut self, path: &Path, owner: Owner) -> ProvisionResult<()> {
        info!(
            "[dry-run] would chown {} to {}:{}",
            path.display(),
            owner.uid,
            owner.gid
        );
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> ProvisionResult<()> {
        info!("[dry-run] would remove {}", path.display());
        Ok(())
    }
}

impl<H: HostProbe> HostProbe for DryRunHost<H> {
    fn effective_uid(&self) -> u32 {
        self.inner.effective_uid()
    }

    fn current_uid(&self) -> u32 {
        self.inner.current_uid()
    }

    fn lookup_user(&self, name: &str) -> Option<TargetUser> {
        self.inner.lookup_user(name)
    }

    fn user_by_uid(&self, uid: u32) -> Option<TargetUser> {
        self.inner.user_by_uid(uid)
    }

    fn list_dir(&self, dir: &Path) -> ProvisionResult<Vec<String>> {
        self.inner.list_dir(dir)
    }

    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        self.inner.find_tool(name)
    }
}
