//! File-backed JSON state shared by every hook.
//!
//! Each hook process reads the documents it needs, mutates them, and writes
//! them back whole. There is no locking: two hooks racing on the same document
//! can lose an update (last writer wins). Writes go through a temp file and a
//! rename, so a crash mid-write never leaves a truncated document behind.
//!
//! # Defensive Design
//!
//! The files live in the project tree and anything can write to them, so loads
//! never fail:
//! - Missing or unreadable file → caller's default
//! - Empty file or corrupt JSON → caller's default (logged)
//! - Reserved prototype keys → stripped before typing
//! - Unknown fields → dropped by the typed record
//! - Wrong shape for the target type → caller's default (logged)

use std::io::Write;
use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::config::{HookConfig, StateLayout};
use crate::error::{Result, SentientError};

/// Keys that must never survive a load, at any depth.
pub const RESERVED_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Recursively rebuilds a document without reserved keys.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key, sanitize(value)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SentientError::io("read state file", e)),
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    let raw: Value =
        serde_json::from_str(&content).map_err(|e| SentientError::json("parse state file", e))?;
    let typed = serde_json::from_value(sanitize(raw))
        .map_err(|e| SentientError::json("decode state file", e))?;
    Ok(Some(typed))
}

/// Loads a JSON document, returning `default` on any failure.
pub fn load_json_file<T: DeserializeOwned>(path: &Path, default: T) -> T {
    match read_document(path) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
            default
        }
    }
}

/// Writes a JSON document atomically, creating parent directories.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| SentientError::json("serialize state file", e))?;

    let parent_dir = path
        .parent()
        .ok_or_else(|| SentientError::NoParent(path.to_path_buf()))?;
    fs::create_dir_all(parent_dir).map_err(|e| SentientError::io("create state dir", e))?;

    let mut temp_file =
        NamedTempFile::new_in(parent_dir).map_err(|e| SentientError::io("create temp file", e))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| SentientError::io("write temp file", e))?;
    temp_file
        .flush()
        .map_err(|e| SentientError::io("flush temp file", e))?;
    temp_file
        .persist(path)
        .map_err(|e| SentientError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

    Ok(())
}

/// Writes a JSON document, reporting failure as `false` instead of an error.
pub fn save_json_file<T: Serialize>(path: &Path, value: &T) -> bool {
    match write_json_atomic(path, value) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to save state file");
            false
        }
    }
}

/// Drops entries from the front (oldest end) until at most `max` remain.
pub fn truncate_oldest<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        let excess = items.len() - max;
        items.drain(..excess);
    }
}

/// Appends one line to a log file. Callers treat failure as non-fatal.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    use fs_err::OpenOptions;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SentientError::io("create log dir", e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SentientError::io("open log file", e))?;
    writeln!(file, "{}", line).map_err(|e| SentientError::io("append log line", e))
}

/// A named state document with a fixed file name inside the state directory.
pub trait Document: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;

    /// Trims list-shaped fields to their caps. Called before every write.
    fn enforce_limits(&mut self, _config: &HookConfig) {}
}

/// Typed get/put access to the documents in one state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    layout: StateLayout,
    config: HookConfig,
}

impl StateStore {
    pub fn new(layout: StateLayout) -> Self {
        let config = HookConfig::load(&layout);
        Self { layout, config }
    }

    pub fn with_config(layout: StateLayout, config: HookConfig) -> Self {
        Self { layout, config }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    pub fn path_of<D: Document>(&self) -> PathBuf {
        self.layout.state_file(D::FILE_NAME)
    }

    pub fn exists<D: Document>(&self) -> bool {
        self.path_of::<D>().is_file()
    }

    /// Returns the stored document, or `D::default()` if there is none.
    pub fn get<D: Document>(&self) -> D {
        load_json_file(&self.path_of::<D>(), D::default())
    }

    /// Enforces the document's caps and writes it. Returns `false` on failure.
    pub fn put<D: Document>(&self, doc: &mut D) -> bool {
        doc.enforce_limits(&self.config);
        save_json_file(&self.path_of::<D>(), doc)
    }

    /// Deletes the document. A missing document counts as removed.
    pub fn remove<D: Document>(&self) -> bool {
        match fs::remove_file(self.path_of::<D>()) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!(error = %e, file = D::FILE_NAME, "Failed to remove state file");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::tempdir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Numbers {
        #[serde(default)]
        items: Vec<u32>,
    }

    impl Document for Numbers {
        const FILE_NAME: &'static str = "numbers.json";

        fn enforce_limits(&mut self, _config: &HookConfig) {
            truncate_oldest(&mut self.items, 3);
        }
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("doc.json");
        let doc = json!({
            "string": "x",
            "number": 1.5,
            "bool": true,
            "null": null,
            "nested": {"list": [1, "two", {"three": 3}]}
        });

        assert!(save_json_file(&file, &doc));
        let loaded: Value = load_json_file(&file, Value::Null);
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_reserved_keys_never_survive_a_load() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("doc.json");
        fs::write(
            &file,
            r#"{"__proto__":{"polluted":true},"ok":1,"inner":{"constructor":{"x":1},"keep":[{"prototype":2,"y":3}]}}"#,
        )
        .unwrap();

        let loaded: Value = load_json_file(&file, Value::Null);
        assert_eq!(loaded, json!({"ok": 1, "inner": {"keep": [{"y": 3}]}}));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let temp = tempdir().unwrap();
        let loaded = load_json_file(&temp.path().join("nope.json"), json!({"d": 1}));
        assert_eq!(loaded, json!({"d": 1}));
    }

    #[test]
    fn test_corrupt_and_empty_files_return_default() {
        let temp = tempdir().unwrap();
        let corrupt = temp.path().join("corrupt.json");
        let empty = temp.path().join("empty.json");
        fs::write(&corrupt, "{invalid json").unwrap();
        fs::write(&empty, "  \n").unwrap();

        assert_eq!(load_json_file(&corrupt, json!([])), json!([]));
        assert_eq!(load_json_file(&empty, json!([])), json!([]));
    }

    #[test]
    fn test_wrong_shape_returns_default() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("numbers.json");
        fs::write(&file, r#"{"items":"not a list"}"#).unwrap();

        assert_eq!(load_json_file(&file, Numbers::default()), Numbers::default());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("a/b/c/doc.json");
        assert!(save_json_file(&file, &json!({"k": "v"})));
        assert!(file.exists());
    }

    #[test]
    fn test_save_failure_returns_false() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "i am a file").unwrap();

        assert!(!save_json_file(&blocker.join("doc.json"), &json!({})));
    }

    #[test]
    fn test_truncate_oldest_keeps_newest() {
        let mut items = vec![1, 2, 3, 4, 5];
        truncate_oldest(&mut items, 2);
        assert_eq!(items, vec![4, 5]);

        let mut short = vec![1];
        truncate_oldest(&mut short, 5);
        assert_eq!(short, vec![1]);
    }

    #[test]
    fn test_store_put_enforces_limits() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));

        let mut doc = Numbers {
            items: vec![1, 2, 3, 4, 5],
        };
        assert!(store.put(&mut doc));
        assert_eq!(store.get::<Numbers>().items, vec![3, 4, 5]);
    }

    #[test]
    fn test_store_remove_is_idempotent() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateLayout::new(temp.path()));

        assert!(store.put(&mut Numbers::default()));
        assert!(store.exists::<Numbers>());
        assert!(store.remove::<Numbers>());
        assert!(!store.exists::<Numbers>());
        assert!(store.remove::<Numbers>());
    }

    #[test]
    fn test_append_line_appends() {
        let temp = tempdir().unwrap();
        let log = temp.path().join("logs/history.log");
        append_line(&log, "one").unwrap();
        append_line(&log, "two").unwrap();
        assert_eq!(fs::read_to_string(&log).unwrap(), "one\ntwo\n");
    }
}
