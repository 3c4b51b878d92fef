//! File path guard for write/edit tools.
//!
//! Paths are folded lexically (`\` → `/`, `~` expansion, `.` and `..`
//! resolution) before matching, so `/tmp/../etc/shadow` is treated as
//! `/etc/shadow`. Nothing here touches the filesystem.

use sentient_hook_protocol::ValidationResult;

const PRIVATE_KEY_NAMES: &[&str] = &["id_rsa", "id_dsa", "id_ecdsa", "id_ed25519"];

const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "poetry.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
];

const KEY_EXTENSIONS: &[&str] = &["pem", "key", "p12", "pfx"];

/// Roots that are always off limits, regardless of platform.
const SYSTEM_ROOTS: &[&str] = &["/etc", "/usr"];

fn platform_roots() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &["/System", "/Library", "/private/etc", "/bin", "/sbin"]
    } else if cfg!(windows) {
        &[
            "c:/windows",
            "c:/program files",
            "c:/program files (x86)",
            "c:/programdata",
        ]
    } else {
        &[
            "/bin", "/sbin", "/boot", "/lib", "/lib32", "/lib64", "/proc", "/sys",
        ]
    }
}

/// Lexically normalizes a path for matching.
pub fn normalize_path(path: &str) -> String {
    let mut raw = path.trim().replace('\\', "/");
    if raw == "~" || raw.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy().replace('\\', "/");
            raw = format!("{}{}", home, &raw[1..]);
        }
    }

    let absolute = raw.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

fn is_under(path: &str, root: &str) -> bool {
    let (path, root) = if cfg!(windows) {
        (path.to_lowercase(), root.to_lowercase())
    } else {
        (path.to_string(), root.to_string())
    };
    path == root || path.starts_with(&format!("{}/", root))
}

/// True when `dirs` appear as consecutive directories with something below them.
fn contains_dir_sequence(components: &[&str], dirs: &[&str]) -> bool {
    components.len() > dirs.len()
        && components[..components.len() - 1]
            .windows(dirs.len())
            .any(|window| window == dirs)
}

fn protected_reason(normalized: &str, components: &[&str]) -> Option<&'static str> {
    let file_name = components.last().copied().unwrap_or("");

    if SYSTEM_ROOTS.iter().any(|root| is_under(normalized, root)) {
        return Some("system configuration directory");
    }
    if platform_roots().iter().any(|root| is_under(normalized, root)) {
        return Some("operating system directory");
    }
    if contains_dir_sequence(components, &[".ssh"]) {
        return Some("SSH keys and configuration");
    }
    if contains_dir_sequence(components, &[".git", "objects"]) {
        return Some("git object database");
    }
    if components.len() >= 2 && components[components.len() - 2..] == [".aws", "credentials"] {
        return Some("AWS credentials");
    }
    if file_name.ends_with(".env.production") {
        return Some("production environment file");
    }
    if PRIVATE_KEY_NAMES.contains(&file_name) {
        return Some("private key");
    }
    None
}

fn caution_warnings(components: &[&str]) -> Vec<String> {
    let file_name = components.last().copied().unwrap_or("");
    let lower = file_name.to_lowercase();
    let mut warnings = Vec::new();

    if file_name == ".env" || file_name.starts_with(".env.") {
        warnings.push("WARNING: environment file may contain secrets".to_string());
    }
    if lower.contains("secret") {
        warnings.push("WARNING: file name suggests it holds secrets".to_string());
    }
    if let Some((_, ext)) = lower.rsplit_once('.') {
        if KEY_EXTENSIONS.contains(&ext) {
            warnings.push("WARNING: key or certificate material".to_string());
        }
    }
    if LOCK_FILES.contains(&file_name) {
        warnings.push(
            "WARNING: lock file; prefer regenerating it with the package manager".to_string(),
        );
    }
    if components.iter().rev().skip(1).any(|c| *c == ".git") {
        warnings.push("WARNING: editing git internals".to_string());
    }
    warnings
}

/// Allows, warns on, or blocks a write to `path`.
///
/// Missing or blank paths are allowed.
pub fn validate_file_path(path: Option<&str>) -> ValidationResult {
    let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) else {
        return ValidationResult::allow();
    };

    let normalized = normalize_path(path);
    let components: Vec<&str> = normalized.split('/').filter(|c| !c.is_empty()).collect();

    if let Some(reason) = protected_reason(&normalized, &components) {
        tracing::info!(path = %normalized, reason, "Blocked protected path");
        return ValidationResult::block(format!(
            "BLOCKED: protected path ({}): {}",
            reason, path
        ));
    }

    let warnings = caution_warnings(&components);
    if warnings.is_empty() {
        ValidationResult::allow()
    } else {
        ValidationResult::allow_with_warnings(warnings)
    }
}
