/// How a provisioning run treats host state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunMode {
    /// Execute every needed mutation
    #[default]
    Apply,
    /// Run all checks, only log the mutations that would happen
    DryRun,
    /// Like `Apply`, but enroll again even if a credential exists
    ReEnroll,
}

impl RunMode {
    pub fn from_flags(dry_run: bool, re_enroll: bool) -> Self {
        match (dry_run, re_enroll) {
            (true, _) => Self::DryRun,
            (false, true) => Self::ReEnroll,
            (false, false) => Self::Apply,
        }
    }

    pub fn is_dry_run(self) -> bool {
        matches!(self, Self::DryRun)
    }
}
