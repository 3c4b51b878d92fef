//! Best-effort git queries with a hard time bound.
//!
//! Hooks run under a host timeout of a few seconds, so every git call is
//! killed after [`GIT_TIMEOUT`]. A missing binary, a non-repository, a non-zero
//! exit or a timeout all come back as `None`.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

pub const GIT_TIMEOUT: Duration = Duration::from_millis(1500);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `git <args>` in `dir` and returns trimmed stdout on success.
pub fn run_git(dir: &Path, args: &[&str]) -> Option<String> {
    let mut child = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    // Drain stdout on a separate thread so a chatty command cannot fill the pipe and stall.
    let mut stdout = child.stdout.take()?;
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        let _ = stdout.read_to_string(&mut buf);
        buf
    });

    let deadline = Instant::now() + GIT_TIMEOUT;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            Ok(None) => {
                tracing::debug!(?args, "git timed out");
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            Err(_) => break None,
        }
    };

    let output = reader.join().ok()?;
    match status {
        Some(status) if status.success() => Some(output.trim_end().to_string()),
        _ => None,
    }
}

/// Current branch name, or `None` outside a repository or on a detached HEAD.
pub fn current_branch(dir: &Path) -> Option<String> {
    run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
        .filter(|branch| !branch.is_empty() && branch != "HEAD")
}
