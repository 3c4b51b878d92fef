//! Post-edit change tracking.

use chrono::Utc;
use sentient_hook_protocol::HookInput;
use serde::Serialize;

use crate::store::{append_line, StateStore};
use crate::types::FileChangeLog;

/// Extension → suggested lint/format commands.
const LINT_SUGGESTIONS: &[(&[&str], &[&str])] = &[
    (
        &["ts", "tsx", "js", "jsx", "mjs", "cjs"],
        &["npx eslint --fix", "npx prettier --write"],
    ),
    (&["py"], &["ruff check --fix", "ruff format"]),
    (&["rs"], &["cargo fmt", "cargo clippy"]),
    (&["go"], &["gofmt -w", "go vet"]),
    (&["css", "scss", "less"], &["npx stylelint --fix"]),
    (&["sh", "bash"], &["shellcheck"]),
    (&["md"], &["npx markdownlint"]),
];

pub fn lint_suggestions(path: &str) -> Vec<String> {
    let Some(ext) = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.contains('/'))
    else {
        return Vec::new();
    };

    LINT_SUGGESTIONS
        .iter()
        .find(|(exts, _)| exts.contains(&ext.as_str()))
        .map(|(_, tools)| tools.iter().map(|tool| format!("{} {}", tool, path)).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEditOutput {
    pub tracked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_changes: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl PostEditOutput {
    fn untracked() -> Self {
        Self {
            tracked: false,
            path: None,
            total_changes: None,
            suggestions: Vec::new(),
        }
    }
}

/// Records a completed write/edit. Failed tool results and missing paths are ignored.
pub fn track_change(store: &StateStore, input: &HookInput) -> PostEditOutput {
    if !input.tool_succeeded() {
        tracing::debug!("Skipping failed tool result");
        return PostEditOutput::untracked();
    }
    let Some(path) = input.file_path() else {
        return PostEditOutput::untracked();
    };

    let tool = input.tool_name.as_deref().unwrap_or("unknown");
    let now = Utc::now();

    let mut log = store.get::<FileChangeLog>();
    log.upsert(path, tool, now);
    if !store.put(&mut log) {
        return PostEditOutput::untracked();
    }
    tracing::debug!(path, tool, total = log.len(), "Tracked file change");

    let line = format!("{} | {} | {}", now.to_rfc3339(), tool, path);
    if let Err(e) = append_line(&store.layout().file_changes_log(), &line) {
        tracing::debug!(error = %e, "Change log append failed");
    }

    PostEditOutput {
        tracked: true,
        path: Some(path.to_string()),
        total_changes: Some(log.len()),
        suggestions: lint_suggestions(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HookConfig, StateLayout};
    use fs_err as fs;
    use tempfile::tempdir;

    fn edit(path: &str) -> HookInput {
        HookInput::parse(&format!(
            r#"{{"tool_name":"Edit","tool_input":{{"file_path":"{}"}}}}"#,
            path
        ))
    }

    #[test]
    fn test_suggestions_by_extension() {
        assert_eq!(
            lint_suggestions("src/app.tsx"),
            vec!["npx eslint --fix src/app.tsx", "npx prettier --write src/app.tsx"]
        );
        assert_eq!(lint_suggestions("main.PY")[0], "ruff check --fix main.PY");
        assert!(lint_suggestions("README").is_empty());
        assert!(lint_suggestions("dir.d/Makefile").is_empty());
        assert!(lint_suggestions("image.png").is_empty());
    }

    #[test]
    fn test_same_path_twice_keeps_one_entry() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));

        let first = track_change(&store, &edit("src/lib.rs"));
        let second = track_change(&store, &edit("src/lib.rs"));

        assert!(first.tracked && second.tracked);
        assert_eq!(second.total_changes, Some(1));
        let log = store.get::<FileChangeLog>();
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries[0].tool, "Edit");
    }

    #[test]
    fn test_failed_tool_result_is_not_tracked() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let input = HookInput::parse(
            r#"{"tool_name":"Write","tool_input":{"file_path":"a.rs"},"tool_result":{"success":false}}"#,
        );

        assert!(!track_change(&store, &input).tracked);
        assert!(!store.exists::<FileChangeLog>());
    }

    #[test]
    fn test_missing_path_is_not_tracked() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        let output = track_change(&store, &HookInput::parse(r#"{"tool_name":"Write"}"#));
        assert_eq!(output, PostEditOutput::untracked());
    }

    #[test]
    fn test_cap_keeps_newest_entries() {
        let temp = tempdir().unwrap();
        let config = HookConfig {
            max_file_changes: 3,
            ..HookConfig::default()
        };
        let store = StateStore::with_config(StateLayout::new(temp.path()), config);
        for i in 0..5 {
            track_change(&store, &edit(&format!("f{}.txt", i)));
        }

        let paths: Vec<_> = store
            .get::<FileChangeLog>()
            .entries
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["f2.txt", "f3.txt", "f4.txt"]);
    }

    #[test]
    fn test_appends_human_readable_log() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        track_change(&store, &edit("docs/guide.md"));

        let log = fs::read_to_string(store.layout().file_changes_log()).unwrap();
        assert!(log.contains("| Edit | docs/guide.md"));
    }

    #[test]
    fn test_unwritable_state_reports_untracked() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(".claude"), "not a directory").unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));

        assert!(!track_change(&store, &edit("a.rs")).tracked);
    }
}
