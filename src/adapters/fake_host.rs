#[cfg(test)]
use crate::error::{CommandError, FilesystemError, ProvisionResult};
#[cfg(test)]
use crate::model::{CommandLine, CommandOutput, Owner, TargetUser};
#[cfg(test)]
use crate::ports::{CommandRunner, FileInfo, FileStore, HostProbe};
#[cfg(test)]
use std::collections::{BTreeMap, BTreeSet};
#[cfg(test)]
use std::io;
#[cfg(test)]
use std::path::{Path, PathBuf};

/// What the scripted `pamu2fcfg` does when run
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentScript {
    /// Exit 0 after writing this credential line
    Succeed(String),
    /// Exit with `status`, possibly after printing some output
    Fail {
        partial: Option<String>,
        status: i32,
    },
}

/// A state-changing call recorded by the fake
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Write(PathBuf),
    CreateDir(PathBuf),
    SetOwner(PathBuf),
    Remove(PathBuf),
    Command(String),
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeFile {
    pub contents: Vec<u8>,
    pub mode: u32,
    pub owner: Owner,
}

/// In-memory host: filesystem, user database, dpkg database, udev and the
/// enrollment utility, plus a trace of every command and mutation.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FakeHost {
    pub euid: u32,
    pub uid: u32,
    pub users: Vec<TargetUser>,
    pub files: BTreeMap<PathBuf, FakeFile>,
    pub dirs: BTreeMap<PathBuf, Owner>,
    /// Link path to target; the fake never resolves links inside paths
    pub symlinks: BTreeMap<PathBuf, PathBuf>,
    /// Link planted by the user while the enrollment utility waits for a touch
    pub planted_during_enrollment: Option<(PathBuf, PathBuf)>,
    pub tools: BTreeSet<String>,
    pub installed: BTreeSet<String>,
    pub broken_packages: BTreeSet<String>,
    pub enrollment: EnrollmentScript,
    pub udev_running: bool,
    pub commands: Vec<CommandLine>,
    pub mutations: Vec<Mutation>,
}

#[cfg(test)]
const ROOT: Owner = Owner { uid: 0, gid: 0 };

#[cfg(test)]
fn not_found(action: &'static str, path: &Path) -> FilesystemError {
    FilesystemError::new(action, path, io::Error::from(io::ErrorKind::NotFound))
}

#[cfg(test)]
impl FakeHost {
    pub fn new() -> Self {
        let mut dirs = BTreeMap::new();
        dirs.insert(PathBuf::from("/"), ROOT);
        Self {
            euid: 0,
            uid: 0,
            users: Vec::new(),
            files: BTreeMap::new(),
            dirs,
            symlinks: BTreeMap::new(),
            planted_during_enrollment: None,
            tools: BTreeSet::new(),
            installed: BTreeSet::new(),
            broken_packages: BTreeSet::new(),
            enrollment: EnrollmentScript::Succeed("alice:khandle,pubkey,es256,+presence\n".to_string()),
            udev_running: true,
            commands: Vec::new(),
            mutations: Vec::new(),
        }
    }

    pub fn with_euid(mut self, euid: u32) -> Self {
        self.euid = euid;
        self
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    /// Add an account whose home directory exists and is owned by it
    pub fn with_user(mut self, name: &str, uid: u32, home: &str) -> Self {
        self = self.with_dir(home);
        self.dirs.insert(PathBuf::from(home), Owner { uid, gid: uid });
        self.users.push(TargetUser {
            name: name.to_string(),
            uid,
            gid: uid,
            home: PathBuf::from(home),
        });
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        for ancestor in Path::new(path).ancestors() {
            self.dirs.entry(ancestor.to_path_buf()).or_insert(ROOT);
        }
        self
    }

    pub fn with_file(self, path: &str, contents: &str) -> Self {
        self.with_file_bytes(path, contents.as_bytes())
    }

    pub fn with_file_bytes(mut self, path: &str, contents: &[u8]) -> Self {
        if let Some(parent) = Path::new(path).parent() {
            self = self.with_dir(&parent.to_string_lossy());
        }
        self.files.insert(
            PathBuf::from(path),
            FakeFile {
                contents: contents.to_vec(),
                mode: 0o644,
                owner: ROOT,
            },
        );
        self
    }

    pub fn with_symlink(mut self, path: &str, target: &str) -> Self {
        if let Some(parent) = Path::new(path).parent() {
            self = self.with_dir(&parent.to_string_lossy());
        }
        self.symlinks
            .insert(PathBuf::from(path), PathBuf::from(target));
        self
    }

    /// The user swaps `path` for a link while the key waits for a touch
    pub fn with_symlink_planted_during_enrollment(mut self, path: &str, target: &str) -> Self {
        self.planted_during_enrollment = Some((PathBuf::from(path), PathBuf::from(target)));
        self
    }

    pub fn with_device(self, path: &str) -> Self {
        self.with_file(path, "")
    }

    pub fn with_tool(mut self, name: &str) -> Self {
        self.tools.insert(name.to_string());
        self
    }

    pub fn with_installed(mut self, packages: &[&str]) -> Self {
        self.installed.extend(packages.iter().map(|p| p.to_string()));
        self
    }

    pub fn with_broken_package(mut self, package: &str) -> Self {
        self.broken_packages.insert(package.to_string());
        self
    }

    pub fn with_enrollment(mut self, script: EnrollmentScript) -> Self {
        self.enrollment = script;
        self
    }

    pub fn is_installed(&self, package: &str) -> bool {
        self.installed.contains(package)
    }

    /// Contents of a file as text
    pub fn file(&self, path: &str) -> Option<String> {
        self.files
            .get(Path::new(path))
            .map(|f| String::from_utf8_lossy(&f.contents).into_owned())
    }

    fn parent_exists(&self, path: &Path) -> bool {
        path.parent().is_some_and(|parent| self.dirs.contains_key(parent))
    }

    fn output(status: i32, stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            synthetic: false,
        }
    }

    fn replace(&mut self, path: &Path, contents: &[u8], mode: u32, owner: Owner) -> ProvisionResult<()> {
        if !self.parent_exists(path) {
            return Err(not_found("write", path).into());
        }
        // Like rename(2), a link at the destination is replaced, not followed
        self.symlinks.remove(path);
        self.files.insert(
            path.to_path_buf(),
            FakeFile {
                contents: contents.to_vec(),
                mode,
                owner,
            },
        );
        self.mutations.push(Mutation::Write(path.to_path_buf()));
        Ok(())
    }
}

#[cfg(test)]
impl CommandRunner for FakeHost {
    fn run(&mut self, command: &CommandLine) -> ProvisionResult<CommandOutput> {
        self.commands.push(command.clone());
        if command.is_mutating() {
            self.mutations.push(Mutation::Command(command.to_string()));
        }

        if command.mentions("pamu2fcfg") {
            if let Some((link, target)) = self.planted_during_enrollment.take() {
                self.symlinks.insert(link, target);
            }
            return Ok(match self.enrollment.clone() {
                EnrollmentScript::Succeed(credential) => Self::output(0, &credential, ""),
                EnrollmentScript::Fail { partial, status } => Self::output(
                    status,
                    partial.as_deref().unwrap_or_default(),
                    "error: no device found",
                ),
            });
        }

        match command.program.as_str() {
            "dpkg-query" => {
                let package = command.args.last().cloned().unwrap_or_default();
                Ok(if self.installed.contains(&package) {
                    Self::output(0, "install ok installed", "")
                } else {
                    Self::output(
                        1,
                        "",
                        &format!("dpkg-query: no packages found matching {package}"),
                    )
                })
            }
            "apt-get" if command.args.first().map(String::as_str) == Some("update") => {
                Ok(Self::output(0, "", ""))
            }
            "apt-get" => {
                let packages: Vec<&String> = command
                    .args
                    .iter()
                    .filter(|arg| !arg.starts_with('-') && arg.as_str() != "install")
                    .collect();
                if let Some(broken) = packages.iter().find(|p| self.broken_packages.contains(**p)) {
                    return Ok(Self::output(
                        100,
                        "",
                        &format!("E: Unable to locate package {broken}"),
                    ));
                }
                self.installed.extend(packages.into_iter().cloned());
                Ok(Self::output(0, "", ""))
            }
            "udevadm" if self.udev_running => Ok(Self::output(0, "", "")),
            "udevadm" => Ok(Self::output(
                1,
                "",
                "Failed to send reload request: No such file or directory",
            )),
            _ => Err(CommandError::Spawn {
                program: command.program.clone(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }
            .into()),
        }
    }
}

#[cfg(test)]
impl FileStore for FakeHost {
    fn read(&self, path: &Path) -> ProvisionResult<Option<Vec<u8>>> {
        Ok(self.files.get(path).map(|f| f.contents.clone()))
    }

    fn metadata(&self, path: &Path) -> ProvisionResult<Option<FileInfo>> {
        if self.symlinks.contains_key(path) {
            return Ok(Some(FileInfo {
                mode: 0o777,
                owner: ROOT,
                len: 0,
                is_dir: false,
                is_symlink: true,
            }));
        }
        if let Some(file) = self.files.get(path) {
            return Ok(Some(FileInfo {
                mode: file.mode,
                owner: file.owner,
                len: file.contents.len() as u64,
                is_dir: false,
                is_symlink: false,
            }));
        }
        Ok(self.dirs.get(path).map(|owner| FileInfo {
            mode: 0o755,
            owner: *owner,
            len: 0,
            is_dir: true,
            is_symlink: false,
        }))
    }

    fn write_atomic(&mut self, path: &Path, contents: &[u8], mode: u32) -> ProvisionResult<()> {
        self.replace(path, contents, mode, ROOT)
    }

    fn write_atomic_owned(
        &mut self,
        path: &Path,
        contents: &[u8],
        mode: u32,
        owner: Owner,
    ) -> ProvisionResult<()> {
        self.replace(path, contents, mode, owner)
    }

    fn create_dir_all(&mut self, path: &Path) -> ProvisionResult<()> {
        let missing: Vec<PathBuf> = path
            .ancestors()
            .filter(|a| !self.dirs.contains_key(*a))
            .map(Path::to_path_buf)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        for dir in missing {
            self.dirs.insert(dir, ROOT);
        }
        self.mutations.push(Mutation::CreateDir(path.to_path_buf()));
        Ok(())
    }

    fn set_owner(&mut self, path: &Path, owner: Owner) -> ProvisionResult<()> {
        if self.symlinks.contains_key(path) {
            // lchown changes the link itself, which the fake does not track
        } else if let Some(file) = self.files.get_mut(path) {
            file.owner = owner;
        } else if let Some(dir_owner) = self.dirs.get_mut(path) {
            *dir_owner = owner;
        } else {
            return Err(not_found("change owner of", path).into());
        }
        self.mutations.push(Mutation::SetOwner(path.to_path_buf()));
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> ProvisionResult<()> {
        let removed =
            self.symlinks.remove(path).is_some() || self.files.remove(path).is_some();
        if removed {
            self.mutations.push(Mutation::Remove(path.to_path_buf()));
        }
        Ok(())
    }
}

#[cfg(test)]
impl HostProbe for FakeHost {
    fn effective_uid(&self) -> u32 {
        self.euid
    }

    fn current_uid(&self) -> u32 {
        self.uid
    }

    fn lookup_user(&self, name: &str) -> Option<TargetUser> {
        self.users.iter().find(|u| u.name == name).cloned()
    }

    fn user_by_uid(&self, uid: u32) -> Option<TargetUser> {
        if uid == 0 {
            return Some(TargetUser {
                name: "root".to_string(),
                uid: 0,
                gid: 0,
                home: PathBuf::from("/root"),
            });
        }
        self.users.iter().find(|u| u.uid == uid).cloned()
    }

    fn list_dir(&self, dir: &Path) -> ProvisionResult<Vec<String>> {
        let mut names: Vec<String> = self
            .files
            .keys()
            .chain(self.dirs.keys())
            .chain(self.symlinks.keys())
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        self.tools
            .contains(name)
            .then(|| PathBuf::from("/usr/bin").join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_tests_for;
    use crate::ports::contract_tests::file_store_contract;

    fn scratch() -> (FakeHost, PathBuf, ()) {
        (FakeHost::new().with_dir("/scratch"), PathBuf::from("/scratch"), ())
    }

    contract_tests_for!(
        fake_host_file_store_contract,
        make = scratch,
        tests = {
            test_read_missing_returns_none => file_store_contract::test_read_missing_returns_none,
            test_write_atomic_creates_file => file_store_contract::test_write_atomic_creates_file,
            test_write_atomic_replaces_existing => file_store_contract::test_write_atomic_replaces_existing,
            test_write_atomic_leaves_no_temp_files => file_store_contract::test_write_atomic_leaves_no_temp_files,
            test_write_atomic_missing_parent_fails => file_store_contract::test_write_atomic_missing_parent_fails,
            test_create_dir_all => file_store_contract::test_create_dir_all,
            test_write_atomic_owned => file_store_contract::test_write_atomic_owned,
            test_remove_file_is_idempotent => file_store_contract::test_remove_file_is_idempotent,
            test_set_owner_keeps_current_owner => file_store_contract::test_set_owner_keeps_current_owner,
            test_list_dir_missing_is_empty => file_store_contract::test_list_dir_missing_is_empty,
        }
    );

    #[test]
    fn test_apt_get_installs_packages() {
        let mut host = FakeHost::new();
        let output = host
            .run(&CommandLine::new("apt-get", ["install", "-y", "udev", "pamu2fcfg"]))
            .unwrap();

        assert!(output.success());
        assert!(host.is_installed("udev"));
        assert!(host.is_installed("pamu2fcfg"));
        assert_eq!(host.mutations.len(), 1);
    }

    #[test]
    fn test_apt_get_broken_package_fails() {
        let mut host = FakeHost::new().with_broken_package("libpam-u2f");
        let output = host
            .run(&CommandLine::new("apt-get", ["install", "-y", "libpam-u2f"]))
            .unwrap();

        assert_eq!(output.status, 100);
        assert!(!host.is_installed("libpam-u2f"));
    }

    #[test]
    fn test_enrollment_prints_credential() {
        let mut host = FakeHost::new()
            .with_enrollment(EnrollmentScript::Succeed("alice:abc\n".to_string()));
        let cmd = CommandLine::new("sudo", ["-u", "alice", "--", "pamu2fcfg"]).interactive();

        let output = host.run(&cmd).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "alice:abc\n");
        assert!(host.mutations.is_empty());
    }

    #[test]
    fn test_write_replaces_symlink_without_touching_target() {
        let mut host = FakeHost::new()
            .with_file("/etc/shadow", "root:x\n")
            .with_symlink("/scratch/link", "/etc/shadow");

        host.write_atomic(Path::new("/scratch/link"), b"new", 0o600)
            .unwrap();

        assert_eq!(host.file("/etc/shadow").as_deref(), Some("root:x\n"));
        assert_eq!(host.file("/scratch/link").as_deref(), Some("new"));
        assert!(!host.symlinks.contains_key(Path::new("/scratch/link")));
    }

    #[test]
    fn test_unknown_program_is_spawn_error() {
        let mut host = FakeHost::new();
        assert!(host.run(&CommandLine::new("usbipd", ["list"])).is_err());
    }

    #[test]
    fn test_list_dir_includes_dirs_and_files() {
        let host = FakeHost::new()
            .with_device("/dev/hidraw0")
            .with_dir("/dev/bus");

        assert_eq!(
            host.list_dir(Path::new("/dev")).unwrap(),
            vec!["bus".to_string(), "hidraw0".to_string()]
        );
    }
}
