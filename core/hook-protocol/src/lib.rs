//! Hook payload and result types for the Sentient lifecycle hooks.
//!
//! This crate is shared by the hook binary and the core library so both agree
//! on the shape of what the host sends and what a hook prints back.
//!
//! Parsing is deliberately forgiving: every field is optional, unknown fields
//! are ignored, and a field of the wrong type degrades to its default instead
//! of failing the whole payload.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Environment variable the host may use instead of stdin.
pub const HOOK_INPUT_ENV: &str = "CLAUDE_HOOK_INPUT";
pub const MAX_INPUT_BYTES: usize = 1024 * 1024; // 1MB

/// Normal completion. Any decision travels in the JSON body.
pub const EXIT_OK: i32 = 0;
/// The host should treat stderr as corrective feedback for the model.
pub const EXIT_FEEDBACK: i32 = 2;

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolInput {
    #[serde(default, deserialize_with = "lenient")]
    pub command: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "notebook_path")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolResult {
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,
}

/// Everything any hook may read from the host payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookInput {
    #[serde(default, deserialize_with = "lenient")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub hook_event_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<String>,

    // Tool events
    #[serde(default, deserialize_with = "lenient")]
    pub tool_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tool_input: ToolInput,
    #[serde(default, deserialize_with = "lenient", alias = "tool_response")]
    pub tool_result: Option<ToolResult>,
    /// Failure detail on tool-failure events: a string or `{message, ..}`.
    #[serde(default)]
    pub error: Option<Value>,

    // Prompt events
    #[serde(default, deserialize_with = "lenient")]
    pub prompt: Option<String>,

    // Sub-agent events
    #[serde(default, deserialize_with = "lenient")]
    pub agent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "agent_type")]
    pub subagent_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,

    // Team events
    #[serde(default, deserialize_with = "lenient", alias = "teammateName")]
    pub teammate_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "tasksCompleted")]
    pub tasks_completed: Vec<String>,
    #[serde(default, deserialize_with = "lenient", alias = "filesChanged")]
    pub files_changed: Vec<String>,
    #[serde(default, deserialize_with = "lenient", alias = "taskId")]
    pub task_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "subject")]
    pub task_subject: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl HookInput {
    /// Parses a raw payload. Empty or malformed input yields the default payload.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn command(&self) -> Option<&str> {
        non_empty(&self.tool_input.command)
    }

    pub fn file_path(&self) -> Option<&str> {
        non_empty(&self.tool_input.file_path)
    }

    pub fn session_id(&self) -> Option<&str> {
        non_empty(&self.session_id)
    }

    pub fn agent_id(&self) -> Option<&str> {
        non_empty(&self.agent_id)
    }

    pub fn teammate_name(&self) -> Option<&str> {
        non_empty(&self.teammate_name)
    }

    /// Text of the reported tool failure, if any.
    pub fn error_message(&self) -> Option<String> {
        let text = match self.error.as_ref()? {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("message") {
                Some(Value::String(s)) => s.clone(),
                _ => Value::Object(map.clone()).to_string(),
            },
            Value::Null => return None,
            other => other.to_string(),
        };
        Some(text).filter(|t| !t.trim().is_empty())
    }

    /// A tool counts as failed only when the host says so explicitly.
    pub fn tool_succeeded(&self) -> bool {
        self.tool_result
            .as_ref()
            .and_then(|r| r.success)
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Block,
}

/// Result contract for the guard hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            reason: None,
            warnings: Vec::new(),
        }
    }

    pub fn allow_with_warnings(warnings: Vec<String>) -> Self {
        Self {
            decision: Decision::Allow,
            reason: None,
            warnings,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Block,
            reason: Some(reason.into()),
            warnings: Vec::new(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.decision == Decision::Block
    }
}
