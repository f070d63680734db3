use std::env;

use crate::adapters::{DryRunHost, SystemHost};
use crate::error::ProvisionResult;
use crate::use_cases::provision as provision_use_case;

pub use crate::config::ProvisionConfig;
pub use crate::model::*;

/// Provision this machine with the default layout
///
/// The account to enroll is taken from `SUDO_USER`.
pub fn provision() -> ProvisionResult<ProvisionReport> {
    provision_with_config(ProvisionConfig::default().with_sudo_user(sudo_user_from_env()))
}

pub fn provision_with_config(config: ProvisionConfig) -> ProvisionResult<ProvisionReport> {
    if config.mode.is_dry_run() {
        let mut host = DryRunHost::new(SystemHost::new());
        provision_use_case(&mut host, &config)
    } else {
        let mut host = SystemHost::new();
        provision_use_case(&mut host, &config)
    }
}

/// The account that invoked sudo, if any
pub fn sudo_user_from_env() -> Option<String> {
    env::var("SUDO_USER").ok().filter(|name| !name.is_empty())
}
