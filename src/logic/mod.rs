mod pam_stack;

pub use pam_stack::{insert_requirement, is_configured, requirement_line, stale_entries};
