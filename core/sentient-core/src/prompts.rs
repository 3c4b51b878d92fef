//! Prompt history with topic tags.

use chrono::Utc;
use sentient_hook_protocol::HookInput;
use serde::Serialize;

use crate::patterns::TOPIC_RULES;
use crate::redact::{redact_secrets, truncate_chars};
use crate::store::StateStore;
use crate::types::{PromptEntry, PromptLog};

pub const MAX_PROMPT_CHARS: usize = 500;

pub fn detect_topics(prompt: &str) -> Vec<String> {
    TOPIC_RULES
        .iter()
        .filter(|rule| rule.regex.is_match(prompt))
        .map(|rule| rule.topic.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOutput {
    pub tracked: bool,
    pub prompt_count: usize,
    pub topics: Vec<String>,
}

/// Stores a redacted, truncated copy of the submitted prompt.
pub fn track_prompt(store: &StateStore, input: &HookInput) -> PromptOutput {
    let Some(prompt) = input
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    else {
        return PromptOutput {
            tracked: false,
            prompt_count: 0,
            topics: Vec::new(),
        };
    };

    let topics = detect_topics(prompt);
    let redacted = redact_secrets(prompt);

    let mut log = store.get::<PromptLog>();
    log.entries.push(PromptEntry {
        timestamp: Utc::now(),
        prompt: truncate_chars(&redacted, MAX_PROMPT_CHARS).to_string(),
        length: prompt.chars().count(),
        topics: topics.clone(),
        session_id: input.session_id().map(str::to_string),
    });
    let tracked = store.put(&mut log);
    tracing::debug!(count = log.entries.len(), ?topics, "Prompt recorded");

    PromptOutput {
        tracked,
        prompt_count: log.entries.len(),
        topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HookConfig, StateLayout};
    use tempfile::tempdir;

    fn prompt(text: &str) -> HookInput {
        HookInput::parse(&serde_json::json!({ "prompt": text, "session_id": "s1" }).to_string())
    }

    #[test]
    fn test_detect_topics() {
        assert_eq!(
            detect_topics("Fix the login bug and add tests"),
            vec!["security", "testing", "errors"]
        );
        assert_eq!(detect_topics("Deploy with Docker"), vec!["devops"]);
        assert!(detect_topics("hello there").is_empty());
    }

    #[test]
    fn test_prompt_is_redacted_and_truncated() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let text = format!("key sk-{} {}", "x".repeat(30), "y".repeat(600));

        let output = track_prompt(&store, &prompt(&text));
        assert!(output.tracked);
        assert_eq!(output.prompt_count, 1);

        let entry = store.get::<PromptLog>().entries.remove(0);
        assert!(entry.prompt.starts_with("key [REDACTED] "));
        assert_eq!(entry.prompt.chars().count(), MAX_PROMPT_CHARS);
        assert_eq!(entry.length, text.chars().count());
        assert_eq!(entry.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_empty_prompt_not_tracked() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        assert!(!track_prompt(&store, &prompt("   ")).tracked);
        assert!(!track_prompt(&store, &HookInput::default()).tracked);
        assert!(!store.exists::<PromptLog>());
    }

    #[test]
    fn test_prompt_log_is_capped() {
        let temp = tempdir().unwrap();
        let config = HookConfig {
            max_prompts: 2,
            ..HookConfig::default()
        };
        let store = StateStore::with_config(StateLayout::new(temp.path()), config);
        for i in 0..4 {
            track_prompt(&store, &prompt(&format!("prompt {}", i)));
        }

        let log = store.get::<PromptLog>();
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[1].prompt, "prompt 3");
    }
}
