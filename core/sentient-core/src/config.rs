//! Paths and limits for the hook state directory.
//!
//! Every component receives a [`StateLayout`] explicitly instead of reading the
//! current directory on its own. The layout is resolved once at hook entry:
//! `--project-dir` beats `CLAUDE_PROJECT_DIR`, which beats the current directory.
//!
//! ```text
//! <project>/.claude/
//! ├── sentient.json            # optional HookConfig overrides
//! └── state/
//!     ├── session_start.json
//!     ├── file_changes.json
//!     ├── prompts.json
//!     ├── agent_history.json
//!     ├── team-state.json
//!     ├── last_verification.json
//!     ├── session_history.log
//!     ├── file_changes.log
//!     ├── backups/<timestamp>/
//!     ├── archive/<session>_<timestamp>.json
//!     └── logs/
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::store::load_json_file;

pub const PROJECT_DIR_ENV: &str = "CLAUDE_PROJECT_DIR";

pub const SESSION_FILE: &str = "session_start.json";
pub const FILE_CHANGES_FILE: &str = "file_changes.json";
pub const PROMPTS_FILE: &str = "prompts.json";
pub const AGENT_HISTORY_FILE: &str = "agent_history.json";
pub const TEAM_STATE_FILE: &str = "team-state.json";
pub const VERIFICATION_FILE: &str = "last_verification.json";

/// State documents copied by pre-compact, in backup order.
pub const BACKED_UP_FILES: &[&str] = &[
    SESSION_FILE,
    FILE_CHANGES_FILE,
    PROMPTS_FILE,
    AGENT_HISTORY_FILE,
    TEAM_STATE_FILE,
    VERIFICATION_FILE,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    project_root: PathBuf,
    state_dir: PathBuf,
}

impl StateLayout {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let state_dir = project_root.join(".claude").join("state");
        Self {
            project_root,
            state_dir,
        }
    }

    /// Resolves the project root from an explicit flag, the host env var, or cwd.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        let root = explicit
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| {
                env::var(PROJECT_DIR_ENV)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from)
            })
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn state_file(&self, name: &str) -> PathBuf {
        self.state_dir.join(name)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.state_dir.join("backups")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.state_dir.join("archive")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    pub fn session_history_log(&self) -> PathBuf {
        self.state_dir.join("session_history.log")
    }

    pub fn file_changes_log(&self) -> PathBuf {
        self.state_dir.join("file_changes.log")
    }

    pub fn config_path(&self) -> PathBuf {
        self.project_root.join(".claude").join("sentient.json")
    }
}

pub const DEFAULT_MAX_FILE_CHANGES: usize = 100;
pub const DEFAULT_MAX_AGENT_HISTORY: usize = 50;
pub const DEFAULT_MAX_PROMPTS: usize = 50;
pub const DEFAULT_MAX_BACKUPS: usize = 10;
pub const DEFAULT_MAX_COMPLETED_TASKS: usize = 200;
pub const DEFAULT_MAX_QUALITY_CHECKS: usize = 100;

/// Caps for every list-shaped state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookConfig {
    pub max_file_changes: usize,
    pub max_agent_history: usize,
    pub max_prompts: usize,
    pub max_backups: usize,
    pub max_completed_tasks: usize,
    pub max_quality_checks: usize,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            max_file_changes: DEFAULT_MAX_FILE_CHANGES,
            max_agent_history: DEFAULT_MAX_AGENT_HISTORY,
            max_prompts: DEFAULT_MAX_PROMPTS,
            max_backups: DEFAULT_MAX_BACKUPS,
            max_completed_tasks: DEFAULT_MAX_COMPLETED_TASKS,
            max_quality_checks: DEFAULT_MAX_QUALITY_CHECKS,
        }
    }
}

impl HookConfig {
    /// Loads overrides from `.claude/sentient.json`, returning defaults if absent or malformed.
    pub fn load(layout: &StateLayout) -> Self {
        load_json_file(&layout.config_path(), HookConfig::default()).normalized()
    }

    /// Zero caps fall back to the defaults.
    fn normalized(self) -> Self {
        let pick = |value: usize, default: usize| if value == 0 { default } else { value };
        Self {
            max_file_changes: pick(self.max_file_changes, DEFAULT_MAX_FILE_CHANGES),
            max_agent_history: pick(self.max_agent_history, DEFAULT_MAX_AGENT_HISTORY),
            max_prompts: pick(self.max_prompts, DEFAULT_MAX_PROMPTS),
            max_backups: pick(self.max_backups, DEFAULT_MAX_BACKUPS),
            max_completed_tasks: pick(self.max_completed_tasks, DEFAULT_MAX_COMPLETED_TASKS),
            max_quality_checks: pick(self.max_quality_checks, DEFAULT_MAX_QUALITY_CHECKS),
        }
    }
}
