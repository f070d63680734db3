use std::fmt;
use std::path::PathBuf;

use super::TargetUser;

/// One stage of a provisioning run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Privilege,
    Virtualization,
    TargetUser,
    DevicePresence,
    Tools,
    EnrollmentPackages,
    DeviceRule,
    DeviceRecheck,
    Credential,
    PamPackages,
    PamBackup,
    PamPolicy,
}

impl Step {
    /// Steps that can change host state
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Step::EnrollmentPackages
                | Step::DeviceRule
                | Step::Credential
                | Step::PamPackages
                | Step::PamBackup
                | Step::PamPolicy
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Privilege => "privilege check",
            Step::Virtualization => "virtualization check",
            Step::TargetUser => "target user",
            Step::DevicePresence => "hardware key presence",
            Step::Tools => "tool availability",
            Step::EnrollmentPackages => "enrollment packages",
            Step::DeviceRule => "udev rule",
            Step::DeviceRecheck => "hardware key re-check",
            Step::Credential => "key enrollment",
            Step::PamPackages => "PAM integration packages",
            Step::PamBackup => "PAM policy backup",
            Step::PamPolicy => "PAM policy",
        };
        f.write_str(name)
    }
}

/// What a step did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    /// Check succeeded
    Passed,
    /// Check found something worth a warning; the run continued
    Warned,
    /// State was already as required
    Skipped,
    /// State was changed
    Applied,
    /// State would be changed (dry run)
    Planned,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepStatus::Passed => "ok",
            StepStatus::Warned => "warning",
            StepStatus::Skipped => "already done",
            StepStatus::Applied => "applied",
            StepStatus::Planned => "would apply",
        };
        f.write_str(name)
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub steps: Vec<(Step, StepStatus)>,
    pub user: Option<TargetUser>,
    pub credential: Option<PathBuf>,
    pub devices: Vec<PathBuf>,
}

impl ProvisionReport {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            user: None,
            credential: None,
            devices: Vec::new(),
        }
    }

    pub fn record(&mut self, step: Step, status: StepStatus) {
        self.steps.push((step, status));
    }

    pub fn status_of(&self, step: Step) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, status)| *status)
    }

    /// True if any step changed host state
    pub fn changed_anything(&self) -> bool {
        self.steps
            .iter()
            .any(|(_, status)| *status == StepStatus::Applied)
    }
}

impl Default for ProvisionReport {
    fn default() -> Self {
        Self::new()
    }
}
