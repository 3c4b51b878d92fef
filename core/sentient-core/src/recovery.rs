//! Tool failure classification for `error-recovery`.
//!
//! Maps the failure text of a tool call to one of three actions: `suggest` a
//! fix, `queue` the problem as a work item, or `escalate` to the user. Nothing
//! is retried and nothing is persisted.

use sentient_hook_protocol::HookInput;
use serde::Serialize;

use crate::patterns::{RecoveryRule, RECOVERY_RULES};
use crate::redact::{redact_secrets, truncate_chars};
use crate::sessions::detect_profile;
use crate::store::StateStore;
use crate::types::Profile;

const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryAction {
    Suggest,
    Queue,
    Escalate,
    /// No failure text, or nothing recognizable in it.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryOutput {
    pub action: RecoveryAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecoveryOutput {
    fn unclassified(message: &str, error: Option<String>) -> Self {
        Self {
            action: RecoveryAction::None,
            category: None,
            message: message.to_string(),
            command: None,
            severity: None,
            error,
        }
    }

    /// One-line summary for stderr.
    pub fn feedback(&self) -> Option<String> {
        if self.action == RecoveryAction::None {
            return None;
        }
        Some(match &self.command {
            Some(command) => format!("[Recovery] {} Suggested command: {}", self.message, command),
            None => format!("[Recovery] {}", self.message),
        })
    }
}

pub fn classify_error(message: &str) -> Option<&'static RecoveryRule> {
    RECOVERY_RULES.iter().find(|rule| rule.regex.is_match(message))
}

fn install_command(profile: Profile) -> &'static str {
    match profile {
        Profile::Python => "pip install -r requirements.txt",
        Profile::Rust => "cargo fetch",
        Profile::Go => "go mod download",
        Profile::Typescript | Profile::Javascript | Profile::General => "npm install",
    }
}

fn lint_command(profile: Profile) -> &'static str {
    match profile {
        Profile::Python => "ruff check --fix .",
        Profile::Rust => "cargo fmt && cargo clippy --fix --allow-dirty",
        Profile::Go => "gofmt -w .",
        Profile::Typescript | Profile::Javascript | Profile::General => "npm run lint -- --fix",
    }
}

pub fn recover(store: &StateStore, input: &HookInput) -> RecoveryOutput {
    let Some(raw) = input.error_message() else {
        return RecoveryOutput::unclassified("No error reported.", None);
    };
    let error = truncate_chars(&redact_secrets(raw.trim()), MAX_ERROR_CHARS).to_string();

    let Some(rule) = classify_error(&raw) else {
        tracing::debug!("Unrecognized tool failure");
        return RecoveryOutput::unclassified("Unrecognized error.", Some(error));
    };

    let command = rule.command.map(str::to_string).or_else(|| {
        let profile = || detect_profile(store.layout().project_root());
        match rule.category {
            "missing-module" => Some(install_command(profile()).to_string()),
            "lint" => Some(lint_command(profile()).to_string()),
            _ => None,
        }
    });
    let severity = match (rule.action, rule.category) {
        (RecoveryAction::Queue, "syntax") => Some("S1"),
        (RecoveryAction::Queue, _) => Some("S2"),
        _ => None,
    };
    tracing::info!(category = rule.category, action = ?rule.action, "Classified tool failure");

    RecoveryOutput {
        action: rule.action,
        category: Some(rule.category),
        message: rule.message.to_string(),
        command,
        severity,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateLayout;
    use fs_err as fs;
    use tempfile::tempdir;

    fn failure(message: &str) -> HookInput {
        HookInput::parse(&serde_json::json!({ "error": message }).to_string())
    }

    #[test]
    fn test_classification_table() {
        let cases = [
            ("fatal: Unable to create '/repo/.git/index.lock': File exists", "git-lock", RecoveryAction::Suggest),
            ("connect ECONNREFUSED 127.0.0.1:5432", "network", RecoveryAction::Suggest),
            ("HTTP 429 Too Many Requests", "rate-limit", RecoveryAction::Suggest),
            ("upstream returned 503 Service Unavailable", "service", RecoveryAction::Suggest),
            ("command timed out after 120s", "timeout", RecoveryAction::Suggest),
            ("EBUSY: resource busy or locked", "lock", RecoveryAction::Suggest),
            ("Error: Cannot find module 'express'", "missing-module", RecoveryAction::Suggest),
            ("SyntaxError: Unexpected token '}'", "syntax", RecoveryAction::Queue),
            ("src/app.ts(3,7): error TS2322: Type 'string' is not assignable", "type", RecoveryAction::Queue),
            ("EACCES: permission denied, open '/etc/hosts'", "permission", RecoveryAction::Escalate),
            ("ENOSPC: no space left on device", "disk", RecoveryAction::Escalate),
            ("FATAL ERROR: JavaScript heap out of memory", "memory", RecoveryAction::Escalate),
            ("401 Unauthorized", "auth", RecoveryAction::Escalate),
            ("error: could not compile `app` due to 2 previous errors", "build", RecoveryAction::Queue),
            ("FAIL src/app.test.ts", "test", RecoveryAction::Queue),
            ("eslint found 3 problems", "lint", RecoveryAction::Suggest),
        ];

        for (message, category, action) in cases {
            let rule = classify_error(message).unwrap_or_else(|| panic!("unclassified: {message}"));
            assert_eq!(rule.category, category, "{message}");
            assert_eq!(rule.action, action, "{message}");
        }
    }

    #[test]
    fn test_blocked_is_not_a_lock() {
        assert!(classify_error("request blocked by policy").is_none());
    }

    #[test]
    fn test_git_lock_carries_command() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let output = recover(&store, &failure("Unable to create .git/index.lock"));

        assert_eq!(output.action, RecoveryAction::Suggest);
        assert_eq!(output.command.as_deref(), Some("rm -f .git/index.lock"));
        assert!(output.feedback().unwrap().contains("rm -f .git/index.lock"));
    }

    #[test]
    fn test_install_command_follows_profile() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("Cargo.toml"), "[package]").unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));

        let output = recover(&store, &failure("error[E0432]: unresolved import `serde`"));
        assert_eq!(output.category, Some("missing-module"));
        assert_eq!(output.command.as_deref(), Some("cargo fetch"));
    }

    #[test]
    fn test_queue_severity() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));

        assert_eq!(recover(&store, &failure("SyntaxError: bad")).severity, Some("S1"));
        assert_eq!(recover(&store, &failure("3 tests failed")).severity, Some("S2"));
        assert_eq!(recover(&store, &failure("EPERM")).severity, None);
    }

    #[test]
    fn test_error_text_is_redacted_and_truncated() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let secret = format!("sk-{}", "b".repeat(30));
        let message = format!("401 Unauthorized for key {} {}", secret, "x".repeat(400));

        let output = recover(&store, &failure(&message));
        let error = output.error.unwrap();
        assert!(!error.contains(&secret));
        assert!(error.contains("[REDACTED]"));
        assert_eq!(error.chars().count(), MAX_ERROR_CHARS);
    }

    #[test]
    fn test_missing_or_unknown_error() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));

        let empty = recover(&store, &HookInput::default());
        assert_eq!(empty.action, RecoveryAction::None);
        assert_eq!(empty.feedback(), None);

        let unknown = recover(&store, &failure("something odd happened"));
        assert_eq!(unknown.action, RecoveryAction::None);
        assert_eq!(unknown.error.as_deref(), Some("something odd happened"));
    }
}
