//! Compiled regex patterns shared across the core.
//!
//! Patterns are compiled once on first use. Each guard rule pairs a regex with
//! the human description that ends up in the hook's `reason` or `warnings`.
//! Commands are matched after normalization (see `guard::command`), so rules
//! can assume bare program names, no quoting and single spaces.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::recovery::RecoveryAction;

pub struct GuardRule {
    pub description: &'static str,
    pub regex: Regex,
}

fn rule(description: &'static str, pattern: &str) -> GuardRule {
    GuardRule {
        description,
        regex: Regex::new(pattern).unwrap(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Command Normalization
// ═══════════════════════════════════════════════════════════════════════════════

/// `/usr/bin/rm` → `rm`, only where a program name is expected.
pub static RE_BINARY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(^|[;&|(`]\s*|\b(?:sudo|env|exec|nohup|xargs|time|command|nice)\s+)(?:/usr/local/s?bin/|/usr/s?bin/|/s?bin/)",
    )
    .unwrap()
});
/// `${name}` → `$name`: kept as literal text, never expanded.
pub static RE_BRACED_SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").unwrap());
pub static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Command Block List
// ═══════════════════════════════════════════════════════════════════════════════

pub static BLOCKED_COMMANDS: Lazy<Vec<GuardRule>> = Lazy::new(|| {
    vec![
        rule(
            "recursive delete of root, home, current directory or wildcard",
            r"\brm\s+(?:-{1,2}[A-Za-z-]+\s+)*-(?:[A-Za-z]*[rR][A-Za-z]*|-recursive)\s+(?:-{1,2}[A-Za-z-]+\s+)*(?:/+(?:\./?)?\*?|~/?\*?|\$HOME/?\*?|\*|\.{1,2}/?)(?:\s|$|[;&|])",
        ),
        rule(
            "raw write to a block device",
            r">\s*/dev/(?:sd[a-z]|hd[a-z]|xvd[a-z]|vd[a-z]|nvme\d|disk\d|mmcblk\d)",
        ),
        rule(
            "dd onto a block device",
            r"\bdd\b[^;&|]*\bof=/dev/(?:sd[a-z]|hd[a-z]|xvd[a-z]|vd[a-z]|nvme\d|disk\d|mmcblk\d)",
        ),
        rule("filesystem format (mkfs)", r"\bmkfs(?:\.[A-Za-z0-9]+)?\b"),
        rule(
            "recursive world-writable permissions on root",
            r"\bchmod\s+(?:-\S+\s+)*(?:-[A-Za-z]*R[A-Za-z]*|--recursive)\s+(?:-\S+\s+)*(?:0?777|a\+rwx|ugo\+rwx|o\+w)\s+/\*?(?:\s|$|[;&|])",
        ),
        rule(
            "recursive world-writable permissions on root",
            r"\bchmod\s+(?:0?777|a\+rwx|ugo\+rwx|o\+w)\s+(?:-[A-Za-z]*R[A-Za-z]*|--recursive)\s+/\*?(?:\s|$|[;&|])",
        ),
        rule(
            "fork bomb",
            r"([A-Za-z_:][\w:]*)\s*\(\s*\)\s*\{\s*[A-Za-z_:][\w:]*\s*\|\s*[A-Za-z_:][\w:]*\s*&\s*\}",
        ),
        rule(
            "reverse shell via netcat",
            r"\b(?:nc|ncat|netcat)\b[^;&|]*\s-[A-Za-z]*e\s*/(?:usr/)?bin/",
        ),
        rule("reverse shell via /dev/tcp", r"/dev/(?:tcp|udp)/"),
        rule(
            "shell history erasure",
            r"\bhistory\s+-c\b|\bunset\s+HISTFILE\b|\bHISTFILE=/dev/null\b|\bHISTSIZE=0\b|\b(?:rm|shred|truncate)\b[^;&|]*\.(?:bash|zsh|sh)_history\b|>\s*\S*\.(?:bash|zsh|sh)_history\b",
        ),
    ]
});

// ═══════════════════════════════════════════════════════════════════════════════
// Command Warn List
// ═══════════════════════════════════════════════════════════════════════════════

pub static WARNED_COMMANDS: Lazy<Vec<GuardRule>> = Lazy::new(|| {
    vec![
        rule("privilege escalation via sudo", r"(?:^|[;&|(]\s*)sudo\b"),
        rule(
            "remote script piped into an interpreter",
            r"\b(?:curl|wget)\b[^|;&]*\|\s*(?:sudo\s+)?(?:(?:ba|z|da|k)?sh|python3?|perl|ruby|node)\b",
        ),
        rule(
            "force push rewrites remote history",
            r"\bgit\s+push\b[^;&|]*\s(?:--force\b|--force-with-lease\b|-f\b)",
        ),
        rule("hard reset discards local changes", r"\bgit\s+reset\s+--hard\b"),
        rule(
            "git clean deletes untracked files",
            r"\bgit\s+clean\s+-[A-Za-z]*f[A-Za-z]*d|\bgit\s+clean\s+-[A-Za-z]*d[A-Za-z]*f",
        ),
        rule("world-writable permissions", r"\bchmod\s+(?:-\S+\s+)*0?777\b"),
        rule("eval of dynamic input", r"(?:^|[;&|(]\s*)eval\s"),
        rule(
            "package publish",
            r"\b(?:npm|yarn|pnpm)\s+publish\b|\bcargo\s+publish\b|\btwine\s+upload\b",
        ),
    ]
});

// ═══════════════════════════════════════════════════════════════════════════════
// Secret Redaction
// ═══════════════════════════════════════════════════════════════════════════════

pub static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"sk-[A-Za-z0-9_-]{20,}",
        r"gh[pousr]_[A-Za-z0-9]{36,}",
        r"github_pat_[A-Za-z0-9_]{22,}",
        r"xox[abprs]-[A-Za-z0-9-]{10,}",
        r"AKIA[0-9A-Z]{16}",
        r"AIza[0-9A-Za-z_-]{35}",
        r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----[\s\S]*?-----END (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// ═══════════════════════════════════════════════════════════════════════════════
// Agent Report Parsing
// ═══════════════════════════════════════════════════════════════════════════════

/// `S0`..`S3` severity markers, e.g. `[S1]` or `severity: s2`.
pub static RE_SEVERITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bS([0-3])\b").unwrap());
pub static RE_SECTION_ISSUES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)issue|finding|problem|bug").unwrap());
pub static RE_SECTION_RECOMMENDATIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)recommend|suggest").unwrap());
pub static RE_SECTION_CHANGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)change|modif|update").unwrap());
/// A bullet line and its content.
pub static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•✓✗]|\d+[.)])\s+(.+?)\s*$").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Prompt Topics
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TopicRule {
    pub topic: &'static str,
    pub regex: Regex,
}

fn topic(topic: &'static str, words: &str) -> TopicRule {
    TopicRule {
        topic,
        regex: Regex::new(&format!(r"(?i)\b(?:{})", words)).unwrap(),
    }
}

/// Matched as word prefixes, so `test` also hits `tests` and `testing`.
pub static TOPIC_RULES: Lazy<Vec<TopicRule>> = Lazy::new(|| {
    vec![
        topic(
            "security",
            r"auth|login|password|token|jwt|oauth|permission|security|vuln|cve|exploit|xss|injection|csrf",
        ),
        topic("api", r"api\b|endpoint|route|rest\b|graphql|controller|handler"),
        topic(
            "database",
            r"database|db\b|query|schema|migration|prisma|sql|postgres|sqlite",
        ),
        topic("testing", r"test|coverage|jest|pytest|spec\b|mock|fixture"),
        topic(
            "ui",
            r"ui\b|component|page\b|form\b|button|modal|dialog|layout|style|css|tailwind",
        ),
        topic(
            "performance",
            r"perf|slow|optimi[sz]|cache|lazy|bundle|speed|latency",
        ),
        topic("docs", r"docs?\b|documentation|readme|changelog|guide\b"),
        topic("errors", r"error|exception|panic|crash|bug|fix"),
        topic(
            "devops",
            r"ci\b|deploy|docker|kubernetes|k8s|pipeline|github.?action|workflow",
        ),
        topic("cli", r"cli\b|terminal|console|argv|flag|spinner"),
    ]
});

// ═══════════════════════════════════════════════════════════════════════════════
// Tool Failure Recovery
// ═══════════════════════════════════════════════════════════════════════════════

pub struct RecoveryRule {
    pub category: &'static str,
    pub action: RecoveryAction,
    pub message: &'static str,
    pub command: Option<&'static str>,
    pub regex: Regex,
}

fn recovery(
    category: &'static str,
    action: RecoveryAction,
    message: &'static str,
    command: Option<&'static str>,
    pattern: &str,
) -> RecoveryRule {
    RecoveryRule {
        category,
        action,
        message,
        command,
        regex: Regex::new(&format!("(?i){}", pattern)).unwrap(),
    }
}

/// First match wins, so specific rules sit above the broad ones.
pub static RECOVERY_RULES: Lazy<Vec<RecoveryRule>> = Lazy::new(|| {
    use RecoveryAction::{Escalate, Queue, Suggest};
    vec![
        recovery(
            "git-lock",
            Suggest,
            "Git index is locked by another process or a crashed one.",
            Some("rm -f .git/index.lock"),
            r"\.git/index\.lock",
        ),
        recovery(
            "network",
            Suggest,
            "Network error. Check connectivity, then run the command again.",
            None,
            r"ETIMEDOUT|ECONNRESET|ECONNREFUSED|ENOTFOUND|EHOSTUNREACH",
        ),
        recovery(
            "rate-limit",
            Suggest,
            "Rate limited. Wait before sending more requests.",
            None,
            r"\b429\b|rate.?limit|too many requests|quota exceeded",
        ),
        recovery(
            "service",
            Suggest,
            "Service temporarily unavailable. Try again shortly.",
            None,
            r"\b50[23]\b|service unavailable|bad gateway",
        ),
        recovery(
            "timeout",
            Suggest,
            "Operation timed out. Run it again with a longer timeout or a smaller scope.",
            None,
            r"\btime.?out\b|\btimed ?out\b|deadline exceeded",
        ),
        recovery(
            "lock",
            Suggest,
            "Resource is locked. Wait for the other process to release it.",
            None,
            r"\bEBUSY\b|resource busy|\block(?:ed)?\b",
        ),
        recovery(
            "missing-module",
            Suggest,
            "Missing dependency. Install the project's packages.",
            None,
            r"MODULE_NOT_FOUND|cannot find module|no module named|ImportError|unresolved import",
        ),
        recovery(
            "syntax",
            Queue,
            "Syntax error. Queued as S1.",
            None,
            r"SyntaxError|unexpected token|parse error",
        ),
        recovery(
            "type",
            Queue,
            "Type error. Queued as S2.",
            None,
            r"TypeError|type.?error|\bTS\d{4}\b|mismatched types",
        ),
        recovery(
            "permission",
            Escalate,
            "Permission denied. User intervention may be required.",
            None,
            r"\bEACCES\b|\bEPERM\b|permission denied|access denied",
        ),
        recovery(
            "disk",
            Escalate,
            "Disk space exhausted. User intervention required.",
            None,
            r"\bENOSPC\b|no space left|disk full",
        ),
        recovery(
            "memory",
            Escalate,
            "Memory exhausted. Break the task into smaller pieces.",
            None,
            r"\bENOMEM\b|out of memory|JavaScript heap",
        ),
        recovery(
            "auth",
            Escalate,
            "Authentication required. The user must provide credentials.",
            None,
            r"\b401\b|unauthorized|not authenticated|authentication failed",
        ),
        recovery(
            "build",
            Queue,
            "Build failure. Queued as S2.",
            None,
            r"build failed|compilation failed|could not compile",
        ),
        recovery(
            "test",
            Queue,
            "Test failure. Queued as S2.",
            None,
            r"tests? failed|(?-i:\bFAIL\b)|AssertionError|assertion failed|expect.*received",
        ),
        recovery(
            "lint",
            Suggest,
            "Lint or formatting errors. Run the project's fixer.",
            None,
            r"\blint\b|eslint|clippy|prettier|formatting",
        ),
    ]
});
