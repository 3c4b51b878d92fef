//! Team coordination: task completion, file ownership, idle tracking.
//!
//! All state lives in `team-state.json`. Teammates are created lazily the
//! first time they report anything.

use chrono::Utc;
use sentient_hook_protocol::HookInput;
use serde::Serialize;

use crate::guard::validate_file_path;
use crate::store::StateStore;
use crate::types::{CompletedTask, QualityCheck, TeamState};

const UNKNOWN_TEAMMATE: &str = "unknown";

fn teammate_of(input: &HookInput) -> String {
    input
        .teammate_name()
        .unwrap_or(UNKNOWN_TEAMMATE)
        .to_string()
}

fn cleaned(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}

// MARK: - task-completed

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletedOutput {
    pub tracked: bool,
    pub task_id: String,
    pub teammate: String,
    pub files_owned: usize,
    pub quality_check: QualityCheck,
}

/// Runs the path guard over every changed file.
fn quality_check(task_id: &str, teammate: &str, files: &[String]) -> QualityCheck {
    let mut issues = Vec::new();
    let mut passed = true;
    for file in files {
        let result = validate_file_path(Some(file));
        if let Some(reason) = result.reason.as_deref() {
            passed = false;
            issues.push(reason.to_string());
        }
        issues.extend(
            result
                .warnings
                .iter()
                .map(|warning| format!("{} ({})", warning, file)),
        );
    }

    QualityCheck {
        task_id: task_id.to_string(),
        teammate: teammate.to_string(),
        files_checked: files.len(),
        issues,
        passed,
        timestamp: Utc::now(),
    }
}

pub fn task_completed(store: &StateStore, input: &HookInput) -> TaskCompletedOutput {
    let teammate = teammate_of(input);
    let task_id = input
        .task_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("task_{}", ulid::Ulid::new()));
    let files = cleaned(&input.files_changed);
    let check = quality_check(&task_id, &teammate, &files);

    let mut state = store.get::<TeamState>();
    for file in &files {
        state.file_ownership.insert(file.clone(), teammate.clone());
    }

    let member = state.teammates.entry(teammate.clone()).or_default();
    if !member.tasks_completed.contains(&task_id) {
        member.tasks_completed.push(task_id.clone());
    }

    state.completed_tasks.push(CompletedTask {
        task_id: task_id.clone(),
        subject: input.task_subject.clone(),
        teammate: teammate.clone(),
        files_changed: files.clone(),
        timestamp: Utc::now(),
    });
    state.quality_checks.push(check.clone());

    let tracked = store.put(&mut state);
    tracing::debug!(task = %task_id, teammate = %teammate, files = files.len(), passed = check.passed, "Task completed");

    TaskCompletedOutput {
        tracked,
        task_id,
        teammate,
        files_owned: files.len(),
        quality_check: check,
    }
}

// MARK: - teammate-idle

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleOutput {
    pub tracked: bool,
    pub teammate: String,
    pub idle_count: u32,
    pub new_tasks: Vec<String>,
    pub tasks_completed: usize,
    /// Idle without ever completing a task.
    pub needs_attention: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

pub fn teammate_idle(store: &StateStore, input: &HookInput) -> IdleOutput {
    let teammate = teammate_of(input);
    let reported = cleaned(&input.tasks_completed);

    let mut state = store.get::<TeamState>();
    let member = state.teammates.entry(teammate.clone()).or_default();

    let new_tasks: Vec<String> = reported
        .into_iter()
        .filter(|task| !member.tasks_completed.contains(task))
        .collect();
    if new_tasks.is_empty() {
        member.idle_count += 1;
    } else {
        member.tasks_completed.extend(new_tasks.iter().cloned());
        member.idle_count = 0;
    }
    member.last_idle = Some(Utc::now());

    let idle_count = member.idle_count;
    let tasks_completed = member.tasks_completed.len();
    let needs_attention = tasks_completed == 0;

    let tracked = store.put(&mut state);
    tracing::debug!(teammate = %teammate, idle_count, new = new_tasks.len(), "Teammate idle");

    let feedback = needs_attention.then(|| {
        format!(
            "Teammate '{}' went idle without completing any tasks. \
             Assign it a task from the shared list or shut it down.",
            teammate
        )
    });

    IdleOutput {
        tracked,
        teammate,
        idle_count,
        new_tasks,
        tasks_completed,
        needs_attention,
        feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateLayout;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, StateStore) {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));
        (temp, store)
    }

    #[test]
    fn test_task_completed_sets_ownership() {
        let (_temp, store) = store();
        let output = task_completed(
            &store,
            &HookInput::parse(
                r#"{"task_id":"t1","teammate_name":"frontend","files_changed":["src/styles.css"]}"#,
            ),
        );

        assert!(output.tracked);
        assert!(output.quality_check.passed);
        let state = store.get::<TeamState>();
        assert_eq!(
            state.file_ownership.get("src/styles.css").map(String::as_str),
            Some("frontend")
        );
        assert_eq!(state.completed_tasks.len(), 1);
        assert_eq!(state.teammates["frontend"].tasks_completed, vec!["t1"]);
    }

    #[test]
    fn test_ownership_is_last_writer_wins() {
        let (_temp, store) = store();
        task_completed(
            &store,
            &HookInput::parse(r#"{"teammate_name":"a","files_changed":["x.rs"]}"#),
        );
        task_completed(
            &store,
            &HookInput::parse(r#"{"teammate_name":"b","files_changed":["x.rs"]}"#),
        );
        assert_eq!(store.get::<TeamState>().file_ownership["x.rs"], "b");
    }

    #[test]
    fn test_task_without_files_still_recorded() {
        let (_temp, store) = store();
        let output = task_completed(
            &store,
            &HookInput::parse(r#"{"teammate_name":"backend","files_changed":[]}"#),
        );

        assert!(output.task_id.starts_with("task_"));
        let state = store.get::<TeamState>();
        assert!(state.file_ownership.is_empty());
        assert_eq!(state.completed_tasks.len(), 1);
        assert_eq!(state.quality_checks[0].files_checked, 0);
    }

    #[test]
    fn test_quality_check_flags_protected_paths() {
        let (_temp, store) = store();
        let output = task_completed(
            &store,
            &HookInput::parse(
                r#"{"teammate_name":"ops","files_changed":["deploy/.env.production","config/.env"]}"#,
            ),
        );

        assert!(!output.quality_check.passed);
        assert_eq!(output.quality_check.files_checked, 2);
        assert!(output.quality_check.issues[0].starts_with("BLOCKED:"));
        assert!(output
            .quality_check
            .issues
            .iter()
            .any(|issue| issue.contains("config/.env")));
    }

    #[test]
    fn test_idle_creates_unknown_teammate() {
        let (_temp, store) = store();
        let output = teammate_idle(
            &store,
            &HookInput::parse(r#"{"teammate_name":"new-teammate","tasks_completed":["t1"]}"#),
        );

        assert!(!output.needs_attention);
        assert_eq!(output.idle_count, 0);
        assert_eq!(output.new_tasks, vec!["t1"]);
        let state = store.get::<TeamState>();
        let member = &state.teammates["new-teammate"];
        assert_eq!(member.tasks_completed, vec!["t1"]);
        assert!(member.last_idle.is_some());
    }

    #[test]
    fn test_repeated_idle_increments_then_resets() {
        let (_temp, store) = store();
        let with = |tasks: &str| {
            HookInput::parse(&format!(
                r#"{{"teammate_name":"qa","tasks_completed":{}}}"#,
                tasks
            ))
        };

        teammate_idle(&store, &with(r#"["t1"]"#));
        assert_eq!(teammate_idle(&store, &with(r#"["t1"]"#)).idle_count, 1);
        assert_eq!(teammate_idle(&store, &with(r#"["t1"]"#)).idle_count, 2);
        let reset = teammate_idle(&store, &with(r#"["t1","t2"]"#));
        assert_eq!(reset.idle_count, 0);
        assert_eq!(reset.new_tasks, vec!["t2"]);
        assert_eq!(reset.tasks_completed, 2);
    }

    #[test]
    fn test_idle_without_any_tasks_needs_attention() {
        let (_temp, store) = store();
        let output = teammate_idle(&store, &HookInput::parse(r#"{"teammate_name":"lazy"}"#));

        assert!(output.needs_attention);
        assert_eq!(output.idle_count, 1);
        assert!(output.feedback.unwrap().contains("lazy"));
    }

    #[test]
    fn test_tasks_from_task_completed_count_for_idle() {
        let (_temp, store) = store();
        task_completed(
            &store,
            &HookInput::parse(r#"{"task_id":"t9","teammate_name":"docs"}"#),
        );
        let output = teammate_idle(&store, &HookInput::parse(r#"{"teammate_name":"docs"}"#));
        assert!(!output.needs_attention);
        assert_eq!(output.tasks_completed, 1);
    }
}
