//! Definition-of-done report for the `stop` event.
//!
//! Summarizes what the session touched and what is left to check. It never
//! blocks; the report is written to `last_verification.json` for later reads.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::git::run_git;
use crate::store::StateStore;
use crate::types::{FileChangeLog, GitSummary, VerificationReport};

const LANGUAGES: &[(&[&str], &str)] = &[
    (&["rs"], "rust"),
    (&["py", "pyi"], "python"),
    (&["ts", "tsx", "mts", "cts"], "typescript"),
    (&["js", "jsx", "mjs", "cjs"], "javascript"),
    (&["go"], "go"),
    (&["css", "scss", "less", "html"], "web"),
    (&["md", "mdx", "rst", "txt"], "docs"),
    (&["json", "yaml", "yml", "toml"], "config"),
    (&["sh", "bash", "zsh"], "shell"),
];

const CHECKS: &[(&str, &str)] = &[
    ("rust", "Run `cargo test` and `cargo clippy` before finishing"),
    ("python", "Run `pytest` and `ruff check .` before finishing"),
    ("typescript", "Run the type checker and `npm test` before finishing"),
    ("javascript", "Run `npm test` and the linter before finishing"),
    ("go", "Run `go test ./...` and `go vet ./...` before finishing"),
];

const CODE_LANGUAGES: &[&str] = &["rust", "python", "typescript", "javascript", "go"];

pub fn language_of(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    LANGUAGES
        .iter()
        .find(|(exts, _)| exts.contains(&ext.as_str()))
        .map(|(_, language)| *language)
        .unwrap_or("other")
}

fn is_test_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.contains("test") || lower.contains("spec")
}

/// Parses `git status --porcelain` v1 output.
pub fn parse_porcelain(output: &str) -> GitSummary {
    let mut summary = GitSummary {
        available: true,
        ..GitSummary::default()
    };
    for line in output.lines() {
        let mut chars = line.chars();
        let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
            continue;
        };
        if index == '?' {
            summary.untracked += 1;
            continue;
        }
        if index != ' ' {
            summary.staged += 1;
        }
        if worktree != ' ' {
            summary.modified += 1;
        }
    }
    summary.clean = summary.staged + summary.modified + summary.untracked == 0;
    summary
}

fn git_summary(root: &Path) -> GitSummary {
    run_git(root, &["status", "--porcelain"])
        .map(|output| parse_porcelain(&output))
        .unwrap_or_default()
}

fn recommendations(
    files: &[String],
    by_language: &BTreeMap<String, usize>,
    git: &GitSummary,
) -> Vec<String> {
    let mut out = Vec::new();

    for (language, check) in CHECKS {
        if by_language.contains_key(*language) {
            out.push(check.to_string());
        }
    }

    let touched_code = CODE_LANGUAGES
        .iter()
        .any(|language| by_language.contains_key(*language));
    if touched_code && !files.iter().any(|f| is_test_path(f)) {
        out.push("Code changed without any test changes; add or update tests".to_string());
    }

    if !git.available {
        out.push("Git status unavailable; review changes manually".to_string());
    } else {
        if git.untracked > 0 {
            out.push(format!(
                "{} untracked file(s); add or ignore them before committing",
                git.untracked
            ));
        }
        if git.modified > 0 {
            out.push(format!("{} file(s) with unstaged changes", git.modified));
        }
    }

    if out.is_empty() {
        out.push("No outstanding checks".to_string());
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutput {
    #[serde(flatten)]
    pub report: VerificationReport,
    pub saved: bool,
}

pub fn verify(store: &StateStore) -> VerifyOutput {
    let files: Vec<String> = store
        .get::<FileChangeLog>()
        .entries
        .into_iter()
        .map(|entry| entry.path)
        .collect();

    let mut by_language = BTreeMap::new();
    for file in &files {
        *by_language.entry(language_of(file).to_string()).or_insert(0) += 1;
    }

    let git = git_summary(store.layout().project_root());
    let report = VerificationReport {
        timestamp: Utc::now(),
        modified_files: files.len(),
        recommendations: recommendations(&files, &by_language, &git),
        by_language,
        git,
    };

    let saved = store.put(&mut Some(report.clone()));
    tracing::debug!(files = report.modified_files, clean = report.git.clean, "Verification report");

    VerifyOutput { report, saved }
}
