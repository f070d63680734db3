//! Provisioning configuration
//!
//! `ProvisionConfig::default()` carries the production paths and package
//! sets for Debian on WSL. Tests point the paths at scratch locations.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::model::{DeviceGlob, DeviceRule, PackageName, RunMode, TargetUser};

/// Everything a provisioning run needs to know about the host layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    pub mode: RunMode,
    /// Account to enroll, from `--user`
    pub user: Option<String>,
    /// `SUDO_USER` of the invoking environment
    pub sudo_user: Option<String>,
    /// Device nodes that prove the key is visible
    pub device_glob: DeviceGlob,
    /// Installed before enrollment
    pub enroll_packages: Vec<PackageName>,
    /// Installed after enrollment, before the PAM edit
    pub pam_packages: Vec<PackageName>,
    /// Tools checked during preflight
    pub tools: Vec<String>,
    pub device_rule: DeviceRule,
    pub pam_policy: PathBuf,
    /// Lines the requirement is inserted before, first match wins
    pub pam_anchors: Vec<String>,
    /// Credential file relative to the target user's home
    pub credential_file: PathBuf,
    pub enrollment_program: String,
    /// Kernel version string used for WSL detection
    pub proc_version: PathBuf,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Apply,
            user: None,
            sudo_user: None,
            device_glob: DeviceGlob::default_hidraw(),
            enroll_packages: ["usbutils", "libfido2-1", "udev", "pamu2fcfg"]
                .into_iter()
                .map(PackageName::known)
                .collect(),
            pam_packages: ["libpam-u2f", "libfido2-dev"]
                .into_iter()
                .map(PackageName::known)
                .collect(),
            tools: vec!["pamu2fcfg".to_string(), "udevadm".to_string()],
            device_rule: DeviceRule::yubico_fido(),
            pam_policy: PathBuf::from("/etc/pam.d/sudo"),
            pam_anchors: vec![
                "@include common-auth".to_string(),
                "auth required pam_unix.so".to_string(),
                "auth include system-auth".to_string(),
                "auth substack system-auth".to_string(),
            ],
            credential_file: PathBuf::from(".config/Yubico/u2f_keys"),
            enrollment_program: "pamu2fcfg".to_string(),
            proc_version: PathBuf::from("/proc/version"),
        }
    }
}

impl ProvisionConfig {
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_sudo_user(mut self, sudo_user: Option<String>) -> Self {
        self.sudo_user = sudo_user;
        self
    }

    /// Backup of the policy file, e.g. `/etc/pam.d/sudo.bak`
    pub fn pam_backup(&self) -> PathBuf {
        with_extra_suffix(&self.pam_policy, ".bak")
    }

    pub fn credential_path(&self, user: &TargetUser) -> PathBuf {
        user.home.join(&self.credential_file)
    }
}

/// `/a/b` + `.tmp` -> `/a/b.tmp`, keeping any existing extension
pub(crate) fn with_extra_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
