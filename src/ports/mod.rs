//! Ports (traits) for host access
//!
//! These traits define the capabilities the provisioning steps need from
//! the machine they run on. The core depends on these abstractions, not on
//! the real system: the same use cases run against the live host, a
//! logging-only dry-run wrapper, or an in-memory fake in tests.

mod command_runner;
mod file_store;
mod host_probe;

pub use command_runner::CommandRunner;
pub use file_store::{FileInfo, FileStore};
pub use host_probe::HostProbe;

/// Combined trait for all host capabilities
///
/// The orchestrator takes one value implementing this and hands it to
/// every stage.
pub trait Host: CommandRunner + FileStore + HostProbe {}

// Blanket implementation for types that implement all capability traits
impl<T> Host for T where T: CommandRunner + FileStore + HostProbe {}
