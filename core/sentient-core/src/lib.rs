//! # sentient-core
//!
//! Core library for the Sentient lifecycle hooks: the guards, the JSON state
//! store, and every stateful hook handler. The `sentient-hook` binary is a thin
//! shell over this crate.
//!
//! ## Design Principles
//!
//! - **Synchronous**: Each hook is one short-lived process. No async runtime.
//! - **Explicit root**: Every handler takes a [`StateStore`] built from a
//!   [`StateLayout`]; nothing reads the current directory on its own.
//! - **Graceful degradation**: Missing or corrupt state loads as empty, failed
//!   writes come back as `tracked: false`, and a block is a decision, not an error.
//! - **Bounded**: Every list document is capped on each write.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sentient_core::{validate_command, StateLayout, StateStore, track_change};
//!
//! let verdict = validate_command(Some("rm -rf /"));
//! assert!(verdict.is_blocked());
//!
//! let store = StateStore::new(StateLayout::discover(None));
//! let output = track_change(&store, &input);
//! ```

pub mod agents;
pub mod changes;
pub mod config;
pub mod error;
pub mod git;
pub mod guard;
pub mod patterns;
pub mod prompts;
pub mod recovery;
pub mod redact;
pub mod sessions;
pub mod store;
pub mod team;
pub mod types;
pub mod verify;

pub use agents::{complete_agent, extract_findings, register_agent, synthesize};
pub use changes::{lint_suggestions, track_change};
pub use config::{HookConfig, StateLayout};
pub use error::{Result, SentientError};
pub use guard::{normalize_command, normalize_path, validate_command, validate_file_path};
pub use prompts::{detect_topics, track_prompt};
pub use recovery::{classify_error, recover, RecoveryAction};
pub use redact::redact_secrets;
pub use sessions::{detect_profile, pre_compact, session_end, session_start};
pub use store::{load_json_file, save_json_file, Document, StateStore};
pub use team::{task_completed, teammate_idle};
pub use types::*;
pub use verify::verify;

pub use sentient_hook_protocol::{Decision, HookInput, ValidationResult};
