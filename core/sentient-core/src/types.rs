//! Persisted state documents.
//!
//! Every document is a typed record: unknown fields are dropped on load and a
//! document of the wrong shape falls back to its default (see `store`). Keys
//! are camelCase on disk.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{
    HookConfig, AGENT_HISTORY_FILE, FILE_CHANGES_FILE, PROMPTS_FILE, SESSION_FILE,
    TEAM_STATE_FILE, VERIFICATION_FILE,
};
use crate::store::{truncate_oldest, Document};

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Project flavor detected from marker files at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Python,
    Typescript,
    Javascript,
    Rust,
    Go,
    #[default]
    #[serde(other)]
    General,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Python => "python",
            Profile::Typescript => "typescript",
            Profile::Javascript => "javascript",
            Profile::Rust => "rust",
            Profile::Go => "go",
            Profile::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub platform: String,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// `None` when no session is live.
impl Document for Option<SessionRecord> {
    const FILE_NAME: &'static str = SESSION_FILE;
}

// ─────────────────────────────────────────────────────────────────────────────
// File changes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeEntry {
    pub path: String,
    pub tool: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry per distinct path, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileChangeLog {
    pub entries: Vec<FileChangeEntry>,
}

impl FileChangeLog {
    /// Inserts or refreshes the entry for `path`, moving it to the newest end.
    pub fn upsert(&mut self, path: &str, tool: &str, timestamp: DateTime<Utc>) {
        self.entries.retain(|entry| entry.path != path);
        self.entries.push(FileChangeEntry {
            path: path.to_string(),
            tool: tool.to_string(),
            timestamp,
        });
    }

    pub fn get(&self, path: &str) -> Option<&FileChangeEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Document for FileChangeLog {
    const FILE_NAME: &'static str = FILE_CHANGES_FILE;

    fn enforce_limits(&mut self, config: &HookConfig) {
        truncate_oldest(&mut self.entries, config.max_file_changes);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prompts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptEntry {
    pub timestamp: DateTime<Utc>,
    /// Redacted and truncated copy of the prompt.
    pub prompt: String,
    /// Length of the original prompt in characters.
    pub length: usize,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptLog {
    pub entries: Vec<PromptEntry>,
}

impl Document for PromptLog {
    const FILE_NAME: &'static str = PROMPTS_FILE;

    fn enforce_limits(&mut self, config: &HookConfig) {
        truncate_oldest(&mut self.entries, config.max_prompts);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agents
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(rename = "S0", default)]
    pub s0: u32,
    #[serde(rename = "S1", default)]
    pub s1: u32,
    #[serde(rename = "S2", default)]
    pub s2: u32,
    #[serde(rename = "S3", default)]
    pub s3: u32,
}

impl SeverityCounts {
    pub fn add(&mut self, other: &SeverityCounts) {
        self.s0 += other.s0;
        self.s1 += other.s1;
        self.s2 += other.s2;
        self.s3 += other.s3;
    }

    pub fn total(&self) -> u32 {
        self.s0 + self.s1 + self.s2 + self.s3
    }
}

/// Structured findings pulled out of a sub-agent's final report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Findings {
    pub severity_counts: SeverityCounts,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub changes: Vec<String>,
}

impl Findings {
    pub fn is_empty(&self) -> bool {
        self.severity_counts.total() == 0
            && self.issues.is_empty()
            && self.recommendations.is_empty()
            && self.changes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub agent_id: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    #[serde(default)]
    pub description: String,
    pub model: String,
    pub status: AgentStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<Findings>,
}

/// Live sub-agents plus the capped list of terminal records, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentHistory {
    pub active: BTreeMap<String, AgentRecord>,
    pub history: Vec<AgentRecord>,
}

impl Document for AgentHistory {
    const FILE_NAME: &'static str = AGENT_HISTORY_FILE;

    fn enforce_limits(&mut self, config: &HookConfig) {
        truncate_oldest(&mut self.history, config.max_agent_history);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Team
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeammateState {
    pub idle_count: u32,
    pub tasks_completed: Vec<String>,
    pub last_idle: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTask {
    pub task_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub teammate: String,
    #[serde(default)]
    pub files_changed: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityCheck {
    pub task_id: String,
    pub teammate: String,
    pub files_checked: usize,
    #[serde(default)]
    pub issues: Vec<String>,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamState {
    pub teammates: BTreeMap<String, TeammateState>,
    pub completed_tasks: Vec<CompletedTask>,
    /// Path → teammate that last reported changing it.
    pub file_ownership: BTreeMap<String, String>,
    pub quality_checks: Vec<QualityCheck>,
}

impl Document for TeamState {
    const FILE_NAME: &'static str = TEAM_STATE_FILE;

    fn enforce_limits(&mut self, config: &HookConfig) {
        truncate_oldest(&mut self.completed_tasks, config.max_completed_tasks);
        truncate_oldest(&mut self.quality_checks, config.max_quality_checks);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Verification
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitSummary {
    /// False when git is missing or this is not a repository.
    pub available: bool,
    pub clean: bool,
    pub modified: usize,
    pub untracked: usize,
    pub staged: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub timestamp: DateTime<Utc>,
    pub modified_files: usize,
    pub by_language: BTreeMap<String, usize>,
    pub git: GitSummary,
    pub recommendations: Vec<String>,
}

impl Document for Option<VerificationReport> {
    const FILE_NAME: &'static str = VERIFICATION_FILE;
}
