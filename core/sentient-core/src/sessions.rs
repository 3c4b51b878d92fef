//! Session lifecycle: start, pre-compact backup, end.
//!
//! ```text
//! session-start → writes session_start.json
//! pre-compact   → copies known state files into backups/<timestamp>/
//! session-end   → archives + deletes session_start.json, appends session_history.log
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use fs_err as fs;
use sentient_hook_protocol::HookInput;
use serde::Serialize;

use crate::config::BACKED_UP_FILES;
use crate::git;
use crate::store::{append_line, save_json_file, StateStore};
use crate::types::{Profile, SessionRecord};

/// Marker files checked in order; the first hit decides the profile.
const PROFILE_MARKERS: &[(&str, Profile)] = &[
    ("pyproject.toml", Profile::Python),
    ("setup.py", Profile::Python),
    ("requirements.txt", Profile::Python),
    ("tsconfig.json", Profile::Typescript),
    ("Cargo.toml", Profile::Rust),
    ("go.mod", Profile::Go),
    ("package.json", Profile::Javascript),
];

const BACKUP_STAMP: &str = "%Y%m%dT%H%M%S%3fZ";
const ARCHIVE_STAMP: &str = "%Y%m%dT%H%M%SZ";

pub fn detect_profile(project_root: &Path) -> Profile {
    PROFILE_MARKERS
        .iter()
        .find(|(marker, _)| project_root.join(marker).is_file())
        .map(|(_, profile)| *profile)
        .unwrap_or_default()
}

// MARK: - session-start

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub session_id: String,
    pub profile: Profile,
    pub git_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStartOutput {
    pub context: SessionContext,
}

pub fn session_start(store: &StateStore, input: &HookInput) -> SessionStartOutput {
    let root = store.layout().project_root();
    let session_id = input
        .session_id()
        .map(str::to_string)
        .unwrap_or_else(|| ulid::Ulid::new().to_string());

    let record = SessionRecord {
        id: session_id.clone(),
        started_at: Utc::now(),
        platform: std::env::consts::OS.to_string(),
        profile: detect_profile(root),
        git_branch: git::current_branch(root),
        source: input.source.clone(),
    };

    if !store.put(&mut Some(record.clone())) {
        tracing::warn!(session = %session_id, "Session record not persisted");
    }
    tracing::debug!(session = %session_id, profile = record.profile.as_str(), "Session started");

    SessionStartOutput {
        context: SessionContext {
            session_id,
            profile: record.profile,
            git_branch: record.git_branch,
        },
    }
}

// MARK: - pre-compact

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreCompactOutput {
    pub backup_count: usize,
    pub backed_up: Vec<String>,
    pub timestamp: String,
    pub pruned: usize,
}

pub fn pre_compact(store: &StateStore) -> PreCompactOutput {
    backup_state(store, Utc::now().format(BACKUP_STAMP).to_string())
}

/// `timestamp` names the backup set; a `-N` suffix is added on collision.
fn backup_state(store: &StateStore, mut timestamp: String) -> PreCompactOutput {
    let layout = store.layout();

    let present: Vec<&str> = BACKED_UP_FILES
        .iter()
        .copied()
        .filter(|name| layout.state_file(name).is_file())
        .collect();

    let mut backed_up = Vec::new();
    if !present.is_empty() {
        let backup_dir = unique_dir(&layout.backups_dir(), &timestamp);
        if let Some(name) = backup_dir.file_name() {
            timestamp = name.to_string_lossy().into_owned();
        }
        match fs::create_dir_all(&backup_dir) {
            Ok(()) => {
                for name in present {
                    match fs::copy(layout.state_file(name), backup_dir.join(name)) {
                        Ok(_) => backed_up.push(name.to_string()),
                        Err(e) => tracing::warn!(file = name, error = %e, "Backup copy failed"),
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to create backup directory"),
        }
    }

    let pruned = prune_backups(&layout.backups_dir(), store.config().max_backups);

    PreCompactOutput {
        backup_count: backed_up.len(),
        backed_up,
        timestamp,
        pruned,
    }
}

fn unique_dir(parent: &Path, stamp: &str) -> std::path::PathBuf {
    let mut candidate = parent.join(stamp);
    let mut n = 1;
    while candidate.exists() {
        candidate = parent.join(format!("{}-{}", stamp, n));
        n += 1;
    }
    candidate
}

/// Keeps only the newest `keep` backup sets. Stamps sort lexicographically by time.
fn prune_backups(backups_dir: &Path, keep: usize) -> usize {
    let Ok(entries) = fs::read_dir(backups_dir) else {
        return 0;
    };

    let mut sets: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.path())
        .collect();
    sets.sort();

    let excess = sets.len().saturating_sub(keep);
    let mut pruned = 0;
    for dir in sets.into_iter().take(excess) {
        match fs::remove_dir_all(&dir) {
            Ok(()) => pruned += 1,
            Err(e) => tracing::warn!(error = %e, "Failed to prune backup set"),
        }
    }
    pruned
}

// MARK: - session-end

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchivedSession<'a> {
    #[serde(flatten)]
    session: &'a SessionRecord,
    ended_at: DateTime<Utc>,
    duration_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndOutput {
    pub session_id: Option<String>,
    /// Seconds between session start and end.
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn session_end(store: &StateStore) -> SessionEndOutput {
    let layout = store.layout();
    let Some(record) = store.get::<Option<SessionRecord>>() else {
        if store.exists::<Option<SessionRecord>>() {
            tracing::warn!("Discarding unreadable live session record");
            store.remove::<Option<SessionRecord>>();
        } else {
            tracing::debug!("No live session to end");
        }
        return SessionEndOutput {
            session_id: None,
            duration: 0,
            archive: None,
        };
    };

    let ended_at = Utc::now();
    let duration = ended_at
        .signed_duration_since(record.started_at)
        .num_seconds()
        .max(0);

    let archive_name = format!(
        "{}_{}.json",
        file_safe(&record.id),
        ended_at.format(ARCHIVE_STAMP)
    );
    let archived = save_json_file(
        &layout.archive_dir().join(&archive_name),
        &ArchivedSession {
            session: &record,
            ended_at,
            duration_seconds: duration,
        },
    );

    // The live record is the only copy until the archive exists.
    if !archived {
        tracing::warn!(session = %record.id, "Session archive failed; keeping live record");
        return SessionEndOutput {
            session_id: Some(record.id),
            duration,
            archive: None,
        };
    }
    store.remove::<Option<SessionRecord>>();

    let line = format!(
        "{} | session={} | profile={} | branch={} | duration={}s",
        ended_at.to_rfc3339(),
        record.id,
        record.profile.as_str(),
        record.git_branch.as_deref().unwrap_or("-"),
        duration
    );
    if let Err(e) = append_line(&layout.session_history_log(), &line) {
        tracing::warn!(error = %e, "Failed to append session history");
    }

    SessionEndOutput {
        session_id: Some(record.id),
        duration,
        archive: Some(archive_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HookConfig, StateLayout};
    use chrono::Duration;
    use tempfile::tempdir;

    fn store_in(root: &Path) -> StateStore {
        StateStore::new(StateLayout::new(root))
    }

    #[test]
    fn test_detect_profile_by_marker() {
        let temp = tempdir().unwrap();
        assert_eq!(detect_profile(temp.path()), Profile::General);

        fs::write(temp.path().join("tsconfig.json"), "{}").unwrap();
        assert_eq!(detect_profile(temp.path()), Profile::Typescript);

        fs::write(temp.path().join("pyproject.toml"), "").unwrap();
        assert_eq!(detect_profile(temp.path()), Profile::Python);
    }

    #[test]
    fn test_session_start_writes_record() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let input = HookInput::parse(r#"{"session_id":"sess-1","source":"startup"}"#);

        let output = session_start(&store, &input);
        assert_eq!(output.context.session_id, "sess-1");
        assert_eq!(output.context.profile, Profile::General);

        let record = store.get::<Option<SessionRecord>>().unwrap();
        assert_eq!(record.id, "sess-1");
        assert_eq!(record.platform, std::env::consts::OS);
        assert_eq!(record.source.as_deref(), Some("startup"));
    }

    #[test]
    fn test_session_start_generates_id() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let output = session_start(&store, &HookInput::default());
        assert_eq!(output.context.session_id.len(), 26);
    }

    #[test]
    fn test_session_end_archives_and_deletes() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let mut record = Some(SessionRecord {
            id: "sess-9".to_string(),
            started_at: Utc::now() - Duration::seconds(90),
            platform: "linux".to_string(),
            profile: Profile::Rust,
            git_branch: Some("main".to_string()),
            source: None,
        });
        assert!(store.put(&mut record));

        let output = session_end(&store);
        assert_eq!(output.session_id.as_deref(), Some("sess-9"));
        assert!(output.duration >= 90);
        assert!(!store.exists::<Option<SessionRecord>>());

        let archives: Vec<_> = fs::read_dir(store.layout().archive_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(archives.len(), 1);
        assert!(archives[0].starts_with("sess-9_"));

        let history = fs::read_to_string(store.layout().session_history_log()).unwrap();
        assert_eq!(history.lines().count(), 1);
        assert!(history.contains("session=sess-9"));
    }

    #[test]
    fn test_session_end_without_session_is_noop() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let output = session_end(&store);
        assert_eq!(output.session_id, None);
        assert_eq!(output.duration, 0);
        assert!(!store.layout().archive_dir().exists());
    }

    #[test]
    fn test_session_end_keeps_record_when_archive_fails() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        session_start(&store, &HookInput::parse(r#"{"session_id":"sess-7"}"#));
        fs::write(store.layout().archive_dir(), "blocks the archive directory").unwrap();

        let output = session_end(&store);
        assert_eq!(output.session_id.as_deref(), Some("sess-7"));
        assert_eq!(output.archive, None);
        assert_eq!(store.get::<Option<SessionRecord>>().unwrap().id, "sess-7");
        assert!(!store.layout().session_history_log().exists());
    }

    #[test]
    fn test_session_end_discards_corrupt_record() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        fs::create_dir_all(store.layout().state_dir()).unwrap();
        fs::write(store.path_of::<Option<SessionRecord>>(), "{not json").unwrap();

        let output = session_end(&store);
        assert_eq!(output.session_id, None);
        assert_eq!(output.duration, 0);
        assert!(!store.exists::<Option<SessionRecord>>());
    }

    #[test]
    fn test_pre_compact_reports_suffixed_directory() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        session_start(&store, &HookInput::default());

        let stamp = "20240101T000000000Z";
        fs::create_dir_all(store.layout().backups_dir().join(stamp)).unwrap();

        let output = backup_state(&store, stamp.to_string());
        assert_eq!(output.timestamp, "20240101T000000000Z-1");
        assert!(store
            .layout()
            .backups_dir()
            .join(&output.timestamp)
            .join("session_start.json")
            .exists());
    }

    #[test]
    fn test_pre_compact_copies_existing_state() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        session_start(&store, &HookInput::default());

        let output = pre_compact(&store);
        assert_eq!(output.backup_count, 1);
        assert_eq!(output.backed_up, vec!["session_start.json".to_string()]);
        assert!(store
            .layout()
            .backups_dir()
            .join(&output.timestamp)
            .join("session_start.json")
            .exists());
    }

    #[test]
    fn test_pre_compact_with_nothing_to_back_up() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let output = pre_compact(&store);
        assert_eq!(output.backup_count, 0);
        assert!(output.backed_up.is_empty());
    }

    #[test]
    fn test_pre_compact_prunes_old_sets() {
        let temp = tempdir().unwrap();
        let config = HookConfig {
            max_backups: 2,
            ..HookConfig::default()
        };
        let store = StateStore::with_config(StateLayout::new(temp.path()), config);
        for stamp in ["20200101T000000000Z", "20200102T000000000Z", "20200103T000000000Z"] {
            fs::create_dir_all(store.layout().backups_dir().join(stamp)).unwrap();
        }
        session_start(&store, &HookInput::default());

        let output = pre_compact(&store);
        assert_eq!(output.pruned, 2);

        let mut remaining: Vec<_> = fs::read_dir(store.layout().backups_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0], "20200103T000000000Z");
        assert_eq!(remaining[1], output.timestamp);
    }
}
