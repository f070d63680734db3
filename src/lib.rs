mod adapters;
pub mod api;
pub mod config;
pub mod error;
mod logic;
pub mod model;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ProvisionConfig;
pub use error::{ProvisionError, ProvisionResult};

// Re-export public API
pub use api::{provision, provision_with_config};
