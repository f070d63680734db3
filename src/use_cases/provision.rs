//! Provisioning use case
//!
//! Runs every stage in order against one host. A failing stage stops the
//! run; everything before it keeps its (consistent) state and a re-run
//! picks up where this one stopped.

use tracing::info;

use super::enrollment::ensure_credential;
use super::install::{ensure_device_rule, ensure_packages};
use super::pam::PamStackEditor;
use super::preflight::{
    check_device_present, check_privilege, check_tool_available, detect_virtualization,
    resolve_target_user,
};
use crate::config::ProvisionConfig;
use crate::error::ProvisionResult;
use crate::model::{ProvisionReport, RunMode, Step, StepStatus};
use crate::ports::Host;

/// Make sudo on `host` require the hardware key
///
/// Stages, in order: preflight checks, enrollment prerequisites, udev rule,
/// device re-check, enrollment, PAM integration packages, policy backup
/// and policy edit. The policy is only edited with a credential from this
/// run in hand.
///
/// # Arguments
///
/// * `host` - Host to provision; wrap it in `DryRunHost` to only plan
/// * `config` - Paths, packages and run mode
///
/// # Errors
///
/// Returns the first stage error. Enrollment errors stop the run before
/// the policy is touched.
pub fn provision<H: Host>(host: &mut H, config: &ProvisionConfig) -> ProvisionResult<ProvisionReport> {
    let dry_run = config.mode.is_dry_run() || host.is_dry_run();
    let mut report = ProvisionReport::new();
    let record = |report: &mut ProvisionReport, step: Step, status: StepStatus| {
        let status = match status {
            StepStatus::Applied if dry_run => StepStatus::Planned,
            other => other,
        };
        info!("{}: {}", step, status);
        report.record(step, status);
    };

    check_privilege(&*host)?;
    record(&mut report, Step::Privilege, StepStatus::Passed);

    let wsl = detect_virtualization(&*host, &config.proc_version);
    record(
        &mut report,
        Step::Virtualization,
        if wsl { StepStatus::Passed } else { StepStatus::Warned },
    );

    let user = resolve_target_user(&*host, config.user.as_deref(), config.sudo_user.as_deref())?;
    info!("Target user: {} ({})", user.name, user.home.display());
    record(&mut report, Step::TargetUser, StepStatus::Passed);
    report.user = Some(user.clone());

    report.devices = check_device_present(&*host, &config.device_glob)?;
    record(&mut report, Step::DevicePresence, StepStatus::Passed);

    let tools_found = config
        .tools
        .iter()
        .fold(true, |found, tool| check_tool_available(&*host, tool) && found);
    record(
        &mut report,
        Step::Tools,
        if tools_found { StepStatus::Passed } else { StepStatus::Warned },
    );

    let status = ensure_packages(host, &config.enroll_packages)?;
    record(&mut report, Step::EnrollmentPackages, status);

    let status = ensure_device_rule(host, &config.device_rule)?;
    record(&mut report, Step::DeviceRule, status);

    report.devices = check_device_present(&*host, &config.device_glob)?;
    record(&mut report, Step::DeviceRecheck, StepStatus::Passed);

    let force = config.mode == RunMode::ReEnroll;
    let (credential, status) = ensure_credential(host, &user, config, force)?;
    record(&mut report, Step::Credential, status);
    report.credential = Some(credential.path().to_path_buf());

    let status = ensure_packages(host, &config.pam_packages)?;
    record(&mut report, Step::PamPackages, status);

    let editor = PamStackEditor::new(config, credential.path());
    if editor.is_configured(&*host)? {
        info!("{} already requires the hardware key", config.pam_policy.display());
        record(&mut report, Step::PamBackup, StepStatus::Skipped);
        record(&mut report, Step::PamPolicy, StepStatus::Skipped);
    } else {
        let status = editor.ensure_backup(host)?;
        record(&mut report, Step::PamBackup, status);
        let status = editor.apply(host, &credential)?;
        record(&mut report, Step::PamPolicy, status);
    }

    Ok(report)
}
