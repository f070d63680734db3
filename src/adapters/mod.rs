//! Adapters - concrete implementations of ports (traits)

mod dry_run;
mod system;

#[cfg(test)]
pub mod fake_host;

// Re-export for convenience
pub use dry_run::DryRunHost;
pub use system::SystemHost;
