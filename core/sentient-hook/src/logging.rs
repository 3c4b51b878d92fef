//! File logging for the hook binary.
//!
//! Stdout carries the hook's JSON result, so logs only ever go to a daily
//! file under `<state>/logs/`. If the project directory is missing or the log
//! file cannot be opened, the hook runs without logging.

use std::env;
use std::path::Path;

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_FILTER_ENV: &str = "SENTIENT_LOG";
const DEBUG_LOG_ENV: &str = "SENTIENT_DEBUG_LOG";
const DEFAULT_FILTER: &str = "warn";

fn filter() -> EnvFilter {
    let debug_enabled = env::var(DEBUG_LOG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Installs the global subscriber. Keep the guard alive until exit to flush.
pub fn init(project_root: &Path, logs_dir: &Path) -> Option<WorkerGuard> {
    if !project_root.is_dir() {
        return None;
    }
    fs::create_dir_all(logs_dir).ok()?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("sentient-hook")
        .filename_suffix("log")
        .build(logs_dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}
