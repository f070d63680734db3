//! Preflight checks
//!
//! Everything here only reads host state. A failing check stops the run
//! before the first mutation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ProvisionError, ProvisionResult, UserError};
use crate::model::{DeviceGlob, TargetUser};
use crate::ports::{FileStore, HostProbe};

/// Fail unless running as root
pub fn check_privilege<H: HostProbe>(host: &H) -> ProvisionResult<()> {
    let euid = host.effective_uid();
    if euid != 0 {
        return Err(ProvisionError::Privilege { euid });
    }
    debug!("Running as root");
    Ok(())
}

/// Device nodes matching `glob`; none is a hard stop
///
/// Enrolling or requiring a key the host cannot see would only lock the
/// operator out, so nothing is changed until this passes.
pub fn check_device_present<H: HostProbe>(host: &H, glob: &DeviceGlob) -> ProvisionResult<Vec<PathBuf>> {
    let devices: Vec<PathBuf> = host
        .list_dir(glob.dir())?
        .into_iter()
        .filter(|name| glob.matches_name(name))
        .map(|name| glob.dir().join(name))
        .collect();

    if devices.is_empty() {
        return Err(ProvisionError::DeviceNotFound {
            pattern: glob.to_string(),
        });
    }

    info!(
        "Found hardware key interfaces: {}",
        devices
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(devices)
}

/// Whether `name` is on `PATH`; absence is handled by the package step
pub fn check_tool_available<H: HostProbe>(host: &H, name: &str) -> bool {
    match host.find_tool(name) {
        Some(path) => {
            debug!("Found {} at {}", name, path.display());
            true
        }
        None => {
            info!("{} is not installed yet; it will be installed", name);
            false
        }
    }
}

/// Whether the kernel identifies as WSL
pub fn detect_virtualization<H: FileStore>(host: &H, proc_version: &Path) -> bool {
    let version = match host.read(proc_version) {
        Ok(Some(data)) => String::from_utf8_lossy(&data).to_lowercase(),
        _ => String::new(),
    };
    let wsl = version.contains("microsoft") || version.contains("wsl");
    if !wsl {
        warn!("This does not look like WSL; continuing, but this setup targets Debian on WSL");
    }
    wsl
}

/// Account whose key gets enrolled
///
/// Order: explicit name, then `SUDO_USER`, then the invoking account.
/// An implicitly chosen root is refused: its credential file would not
/// match the users who actually run sudo.
pub fn resolve_target_user<H: HostProbe>(
    host: &H,
    explicit: Option<&str>,
    sudo_user: Option<&str>,
) -> ProvisionResult<TargetUser> {
    if let Some(name) = explicit {
        let user = host
            .lookup_user(name)
            .ok_or_else(|| UserError::NotFound(name.to_string()))?;
        if user.is_root() {
            warn!("Enrolling a key for root; only root's sudo will accept it");
        }
        return Ok(user);
    }

    if let Some(name) = sudo_user.filter(|n| !n.is_empty() && *n != "root") {
        return Ok(host
            .lookup_user(name)
            .ok_or_else(|| UserError::NotFound(name.to_string()))?);
    }

    let user = host
        .user_by_uid(host.current_uid())
        .ok_or(UserError::Unresolved)?;
    if user.is_root() {
        return Err(UserError::RootTarget.into());
    }
    Ok(user)
}
