//! Live host implementation of the ports
//!
//! Runs real processes and touches the real filesystem. Atomic replace is
//! implemented once here and shared by every file the tool writes.

use std::env;
use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{fchown, lchown, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::Builder;
use tracing::{debug, warn};
use uzers::os::unix::UserExt;
use uzers::User;

use crate::error::{CommandError, FilesystemError, ProvisionResult};
use crate::model::{CommandLine, CommandOutput, Owner, TargetUser};
use crate::ports::{CommandRunner, FileInfo, FileStore, HostProbe};

/// The machine this process runs on
#[derive(Debug, Clone, Default)]
pub struct SystemHost;

impl SystemHost {
    pub fn new() -> Self {
        Self
    }
}

fn target_user(user: &User) -> TargetUser {
    TargetUser {
        name: user.name().to_string_lossy().into_owned(),
        uid: user.uid(),
        gid: user.primary_group_id(),
        home: user.home_dir().to_path_buf(),
    }
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Temporary file in the target's directory, filled, synced and renamed
/// over `path`
///
/// The temporary file is created exclusively under a random name, so a
/// planted symlink cannot redirect it. Mode and owner go through its file
/// descriptor.
fn replace_file(path: &Path, contents: &[u8], mode: u32, owner: Option<Owner>) -> ProvisionResult<()> {
    let fail = |e: io::Error| FilesystemError::new("write", path, e);

    let (dir, name) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => (dir, name.to_string_lossy()),
        _ => {
            return Err(fail(io::Error::new(
                io::ErrorKind::InvalidInput,
                "path has no parent directory",
            ))
            .into())
        }
    };

    let mut temp_file = Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(fail)?;

    temp_file.write_all(contents).map_err(fail)?;
    if let Some(owner) = owner {
        fchown(temp_file.as_file(), Some(owner.uid), Some(owner.gid)).map_err(fail)?;
    }
    temp_file
        .as_file()
        .set_permissions(Permissions::from_mode(mode))
        .map_err(fail)?;
    temp_file.as_file().sync_all().map_err(fail)?;

    temp_file.persist(path).map_err(|e| fail(e.error))?;
    sync_dir(dir);

    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Make a rename in `dir` durable
fn sync_dir(dir: &Path) {
    match File::open(dir) {
        Ok(handle) => {
            if let Err(e) = handle.sync_all() {
                warn!("Could not sync directory {}: {}", dir.display(), e);
            }
        }
        Err(e) => warn!("Could not open directory {} to sync it: {}", dir.display(), e),
    }
}

impl CommandRunner for SystemHost {
    fn run(&mut self, command: &CommandLine) -> ProvisionResult<CommandOutput> {
        debug!("Running: {}", command);

        let spawn_error = |source: io::Error| CommandError::Spawn {
            program: command.program.clone(),
            source,
        };

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k, v)));

        if command.interactive {
            process.stdin(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            process.stdin(Stdio::null()).stderr(Stdio::piped());
        }

        process.stdout(Stdio::piped());

        let output = process.output().map_err(spawn_error)?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            synthetic: false,
        })
    }
}

impl FileStore for SystemHost {
    fn read(&self, path: &Path) -> ProvisionResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FilesystemError::new("read", path, e).into()),
        }
    }

    fn metadata(&self, path: &Path) -> ProvisionResult<Option<FileInfo>> {
        match fs::symlink_metadata(path) {
            Ok(meta) => Ok(Some(FileInfo {
                mode: meta.mode() & 0o7777,
                owner: Owner {
                    uid: meta.uid(),
                    gid: meta.gid(),
                },
                len: meta.len(),
                is_dir: meta.is_dir(),
                is_symlink: meta.file_type().is_symlink(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FilesystemError::new("inspect", path, e).into()),
        }
    }

    fn write_atomic(&mut self, path: &Path, contents: &[u8], mode: u32) -> ProvisionResult<()> {
        replace_file(path, contents, mode, None)
    }

    fn write_atomic_owned(
        &mut self,
        path: &Path,
        contents: &[u8],
        mode: u32,
        owner: Owner,
    ) -> ProvisionResult<()> {
        replace_file(path, contents, mode, Some(owner))
    }

    fn create_dir_all(&mut self, path: &Path) -> ProvisionResult<()> {
        fs::create_dir_all(path).map_err(|e| FilesystemError::new("create directory", path, e))?;
        Ok(())
    }

    fn set_owner(&mut self, path: &Path, owner: Owner) -> ProvisionResult<()> {
        lchown(path, Some(owner.uid), Some(owner.gid))
            .map_err(|e| FilesystemError::new("change owner of", path, e))?;
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> ProvisionResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FilesystemError::new("remove", path, e).into()),
        }
    }
}

impl HostProbe for SystemHost {
    fn effective_uid(&self) -> u32 {
        uzers::get_effective_uid()
    }

    fn current_uid(&self) -> u32 {
        uzers::get_current_uid()
    }

    fn lookup_user(&self, name: &str) -> Option<TargetUser> {
        if name.is_empty() || name.contains('\0') {
            return None;
        }
        uzers::get_user_by_name(name).map(|user| target_user(&user))
    }

    fn user_by_uid(&self, uid: u32) -> Option<TargetUser> {
        uzers::get_user_by_uid(uid).map(|user| target_user(&user))
    }

    fn list_dir(&self, dir: &Path) -> ProvisionResult<Vec<String>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FilesystemError::new("list", dir, e).into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FilesystemError::new("list", dir, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        if name.contains('/') {
            let path = PathBuf::from(name);
            return is_executable(&path).then_some(path);
        }
        let path_var = env::var_os("PATH")?;
        env::split_paths(&path_var)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }
}
