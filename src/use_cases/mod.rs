//! Use cases (orchestration)
//!
//! Each stage of a provisioning run is a function over the host ports;
//! `provision` runs them in order.

mod enrollment;
mod install;
mod pam;
mod preflight;
mod provision;

pub use enrollment::{ensure_credential, Credential};
pub use install::{ensure_device_rule, ensure_packages};
pub use pam::PamStackEditor;
pub use preflight::{
    check_device_present, check_privilege, check_tool_available, detect_virtualization,
    resolve_target_user,
};
pub use provision::provision;
