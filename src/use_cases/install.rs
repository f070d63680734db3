//! Package and device rule installation

use tracing::{debug, info, warn};

use crate::error::{InstallError, ProvisionResult};
use crate::model::{CommandLine, DeviceRule, PackageName, StepStatus};
use crate::ports::{CommandRunner, FileStore};

const INSTALLED: &str = "install ok installed";

/// Whether dpkg reports `package` as fully installed
fn is_installed<H: CommandRunner>(host: &mut H, package: &PackageName) -> ProvisionResult<bool> {
    let output = host.run(&CommandLine::probe(
        "dpkg-query",
        ["-W", "-f=${Status}", package.as_str()],
    ))?;
    Ok(output.success() && output.stdout.trim().ends_with(INSTALLED))
}

fn apt_get<H: CommandRunner>(host: &mut H, args: &[&str]) -> ProvisionResult<()> {
    let command =
        CommandLine::new("apt-get", args.iter().copied()).env("DEBIAN_FRONTEND", "noninteractive");
    let output = host.run(&command)?;
    if !output.success() {
        return Err(InstallError::ManagerFailed {
            action: command.to_string(),
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Install whichever of `packages` dpkg does not know yet
///
/// Nothing runs when everything is present: no index update, no install.
pub fn ensure_packages<H: CommandRunner>(
    host: &mut H,
    packages: &[PackageName],
) -> ProvisionResult<StepStatus> {
    let mut missing = Vec::new();
    for package in packages {
        if is_installed(host, package)? {
            debug!("{} is installed", package);
        } else {
            missing.push(package.as_str());
        }
    }

    if missing.is_empty() {
        info!("Packages already installed: {}", join(packages));
        return Ok(StepStatus::Skipped);
    }

    info!("Installing: {}", missing.join(" "));
    apt_get(host, &["update"])?;
    let mut install = vec!["install", "-y"];
    install.extend(missing);
    apt_get(host, &install)?;

    Ok(StepStatus::Applied)
}

fn join(packages: &[PackageName]) -> String {
    packages
        .iter()
        .map(PackageName::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write the udev rule if it differs, then ask udev to reload
///
/// udev is often not running inside WSL, so a failed reload is only a
/// warning and is reported as `Warned`.
pub fn ensure_device_rule<H: CommandRunner + FileStore>(
    host: &mut H,
    rule: &DeviceRule,
) -> ProvisionResult<StepStatus> {
    if let Some(existing) = host.read(&rule.path)? {
        if rule.matches(&String::from_utf8_lossy(&existing)) {
            info!("udev rule {} is up to date", rule.path.display());
            return Ok(StepStatus::Skipped);
        }
        info!("Replacing outdated udev rule {}", rule.path.display());
    } else {
        info!("Writing udev rule {}", rule.path.display());
    }

    if let Some(dir) = rule.path.parent() {
        if !host.exists(dir) {
            debug!("Creating {}", dir.display());
            host.create_dir_all(dir)?;
        }
    }
    host.write_atomic(&rule.path, rule.contents.as_bytes(), 0o644)?;

    let mut reloaded = true;
    for args in [&["control", "--reload-rules"][..], &["trigger"][..]] {
        let command = CommandLine::new("udevadm", args.iter().copied());
        match host.run(&command) {
            Ok(output) if output.success() => {}
            Ok(output) => {
                warn!(
                    "`{}` exited with status {}: {}",
                    command,
                    output.status,
                    output.stderr.trim()
                );
                reloaded = false;
            }
            Err(err) => {
                warn!("{}", err);
                reloaded = false;
            }
        }
    }

    if reloaded {
        Ok(StepStatus::Applied)
    } else {
        warn!("udev did not reload; re-attach the key if /dev/hidraw* permissions look wrong");
        Ok(StepStatus::Warned)
    }
}
