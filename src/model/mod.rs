//! Domain types for provisioning
//!
//! These types wrap primitives to enforce invariants at construction
//! (package names, device patterns) and to give host artifacts a name.

mod command;
mod device_glob;
mod device_rule;
mod package;
mod report;
mod run_mode;
mod user;

pub use command::{CommandLine, CommandOutput, Effect};
pub use device_glob::{DeviceGlob, DeviceGlobError};
pub use device_rule::DeviceRule;
pub use package::{PackageName, PackageNameError};
pub use report::{ProvisionReport, Step, StepStatus};
pub use run_mode::RunMode;
pub use user::{Owner, TargetUser};
