//! sentient-hook: CLI hook handler for the Sentient lifecycle hooks.
//!
//! Called directly by Claude Code hooks configured in `.claude/settings.json`,
//! one subcommand per hook. Reads one JSON payload from `CLAUDE_HOOK_INPUT` or
//! stdin and prints exactly one JSON object to stdout.
//!
//! ## Exit codes
//!
//! - `0`: normal completion; any allow/block decision is in the JSON body
//! - `2`: corrective feedback on stderr (`teammate-idle` only)

mod handle;
mod input;
mod logging;

use clap::{Parser, Subcommand};
use sentient_core::{StateLayout, StateStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sentient-hook")]
#[command(about = "Sentient lifecycle hooks for Claude Code")]
#[command(version)]
struct Cli {
    /// Project root (defaults to $CLAUDE_PROJECT_DIR, then the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    hook: Hook,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Allow, warn on, or block a shell command
    ValidateCommand,
    /// Allow, warn on, or block a file write
    ValidateFile,
    /// Record a new session and detect the project profile
    SessionStart,
    /// Back up state files before context compaction
    PreCompact,
    /// Archive the live session
    SessionEnd,
    /// Track a completed write or edit
    PostEdit,
    /// Register a sub-agent
    AgentStart,
    /// Record a finished sub-agent and synthesize findings
    AgentStop,
    /// Record a completed team task and file ownership
    TaskCompleted,
    /// Update idle tracking for a teammate
    TeammateIdle,
    /// Write the definition-of-done report
    Verify,
    /// Record a submitted prompt
    PromptSubmit,
    /// Classify a tool failure and suggest a recovery
    ErrorRecovery,
}

fn main() {
    let cli = Cli::parse();
    let layout = StateLayout::discover(cli.project_dir);
    let logging_guard = logging::init(layout.project_root(), &layout.logs_dir());

    let input = input::InputSource::detect().read();
    let store = StateStore::new(layout);
    let outcome = handle::run(cli.hook, &store, &input);

    println!("{}", outcome.body);
    if let Some(feedback) = &outcome.feedback {
        eprintln!("{}", feedback);
    }

    // process::exit skips destructors; flush logs first.
    drop(logging_guard);
    std::process::exit(outcome.exit_code);
}
