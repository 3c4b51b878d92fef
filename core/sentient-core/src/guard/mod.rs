//! Stateless guards for proposed tool calls.
//!
//! Both validators are pure functions of their input and return a
//! [`ValidationResult`]. A block is a decision reported to the host, never an
//! error, and absent input always resolves to `allow`.
//!
//! - [`command`]: shell commands for the Bash tool
//! - [`path`]: target paths for Write/Edit/NotebookEdit

pub mod command;
pub mod path;

pub use command::{normalize_command, validate_command};
pub use path::{normalize_path, validate_file_path};
pub use sentient_hook_protocol::{Decision, ValidationResult};
