//! Dispatch from a hook subcommand to its core handler.
//!
//! Every hook produces exactly one JSON object. Only `teammate-idle` uses a
//! non-zero exit code, and only when the teammate needs attention.
//!
//! ```text
//! validate-command → guard::validate_command   (PreToolUse: Bash)
//! validate-file    → guard::validate_file_path (PreToolUse: Write/Edit)
//! session-start    → sessions::session_start
//! pre-compact      → sessions::pre_compact
//! session-end      → sessions::session_end
//! post-edit        → changes::track_change     (PostToolUse: Write/Edit)
//! agent-start      → agents::register_agent    (SubagentStart)
//! agent-stop       → agents::complete_agent    (SubagentStop)
//! task-completed   → team::task_completed
//! teammate-idle    → team::teammate_idle       (exit 2 + stderr when idle with no tasks)
//! verify           → verify::verify            (Stop)
//! prompt-submit    → prompts::track_prompt     (UserPromptSubmit)
//! error-recovery   → recovery::recover         (PostToolUseFailure)
//! ```

use sentient_core::{
    complete_agent, pre_compact, recover, register_agent, session_end, session_start, task_completed,
    teammate_idle, track_change, track_prompt, validate_command, validate_file_path, verify,
    HookInput, StateStore,
};
use sentient_hook_protocol::{EXIT_FEEDBACK, EXIT_OK};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Hook;

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub body: Value,
    pub exit_code: i32,
    /// Printed to stderr; the host shows it to the model on exit code 2.
    pub feedback: Option<String>,
}

impl Outcome {
    fn ok<T: Serialize>(value: &T) -> Self {
        Self {
            body: to_body(value),
            exit_code: EXIT_OK,
            feedback: None,
        }
    }
}

fn to_body<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize hook output");
        Value::Object(Map::new())
    })
}

pub fn run(hook: Hook, store: &StateStore, input: &HookInput) -> Outcome {
    tracing::debug!(?hook, event = ?input.hook_event_name, "Handling hook");

    match hook {
        Hook::ValidateCommand => {
            let result = validate_command(input.command());
            let mut outcome = Outcome::ok(&result);
            outcome.feedback = result.reason;
            outcome
        }
        Hook::ValidateFile => {
            let result = validate_file_path(input.file_path());
            let mut outcome = Outcome::ok(&result);
            outcome.feedback = result.reason;
            outcome
        }
        Hook::SessionStart => Outcome::ok(&session_start(store, input)),
        Hook::PreCompact => Outcome::ok(&pre_compact(store)),
        Hook::SessionEnd => Outcome::ok(&session_end(store)),
        Hook::PostEdit => Outcome::ok(&track_change(store, input)),
        Hook::AgentStart => Outcome::ok(&register_agent(store, input)),
        Hook::AgentStop => Outcome::ok(&complete_agent(store, input)),
        Hook::TaskCompleted => Outcome::ok(&task_completed(store, input)),
        Hook::TeammateIdle => {
            let output = teammate_idle(store, input);
            let mut outcome = Outcome::ok(&output);
            if output.needs_attention {
                outcome.exit_code = EXIT_FEEDBACK;
                outcome.feedback = output.feedback;
            }
            outcome
        }
        Hook::Verify => Outcome::ok(&verify(store)),
        Hook::PromptSubmit => Outcome::ok(&track_prompt(store, input)),
        Hook::ErrorRecovery => {
            let output = recover(store, input);
            let mut outcome = Outcome::ok(&output);
            outcome.feedback = output.feedback();
            outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentient_core::StateLayout;
    use tempfile::tempdir;

    #[test]
    fn blocked_command_carries_reason_to_stderr() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let input = HookInput::parse(r#"{"tool_input":{"command":"rm -rf /"}}"#);

        let outcome = run(Hook::ValidateCommand, &store, &input);
        assert_eq!(outcome.exit_code, EXIT_OK);
        assert_eq!(outcome.body["decision"], "block");
        assert!(outcome.feedback.unwrap().starts_with("BLOCKED:"));
    }

    #[test]
    fn idle_without_tasks_exits_with_feedback() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let input = HookInput::parse(r#"{"teammate_name":"idle-one"}"#);

        let outcome = run(Hook::TeammateIdle, &store, &input);
        assert_eq!(outcome.exit_code, EXIT_FEEDBACK);
        assert_eq!(outcome.body["needsAttention"], true);
        assert!(outcome.feedback.is_some());
    }

    #[test]
    fn error_recovery_escalates_without_failing() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let input = HookInput::parse(r#"{"error":"ENOSPC: no space left on device"}"#);

        let outcome = run(Hook::ErrorRecovery, &store, &input);
        assert_eq!(outcome.exit_code, EXIT_OK);
        assert_eq!(outcome.body["action"], "escalate");
        assert!(outcome.feedback.unwrap().starts_with("[Recovery]"));
    }

    #[test]
    fn idle_with_tasks_exits_cleanly() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let input = HookInput::parse(r#"{"teammate_name":"busy","tasks_completed":["t1"]}"#);

        let outcome = run(Hook::TeammateIdle, &store, &input);
        assert_eq!(outcome.exit_code, EXIT_OK);
        assert_eq!(outcome.feedback, None);
    }
}
