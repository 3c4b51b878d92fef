//! Shell command guard.
//!
//! Commands are normalized before matching so trivial spellings do not slip
//! past the rules: `/usr/bin/rm -rf ~`, `"rm" -rf '/'` and `${rm} -rf /` all
//! normalize to something the block list recognizes.

use sentient_hook_protocol::ValidationResult;

use crate::patterns::{
    GuardRule, BLOCKED_COMMANDS, RE_BINARY_PREFIX, RE_BRACED_SUBSTITUTION, RE_WHITESPACE,
    WARNED_COMMANDS,
};

const MAX_MATCH_ECHO: usize = 80;

/// Rewrites a command into the canonical form the rules are written against.
pub fn normalize_command(command: &str) -> String {
    let unquoted: String = command
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\\'))
        .collect();
    let literal = RE_BRACED_SUBSTITUTION.replace_all(&unquoted, |caps: &regex::Captures| {
        format!("${}", &caps[1])
    });
    let bare = RE_BINARY_PREFIX.replace_all(&literal, "${1}");
    RE_WHITESPACE.replace_all(bare.trim(), " ").into_owned()
}

fn first_match<'a>(rules: &'a [GuardRule], command: &str) -> Option<(&'a GuardRule, String)> {
    rules.iter().find_map(|rule| {
        rule.regex
            .find(command)
            .map(|m| (rule, m.as_str().trim().chars().take(MAX_MATCH_ECHO).collect()))
    })
}

/// Allows, warns on, or blocks a shell command.
///
/// Missing or blank commands are allowed: the guard never blocks for lack of
/// information.
pub fn validate_command(command: Option<&str>) -> ValidationResult {
    let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
        return ValidationResult::allow();
    };

    let normalized = normalize_command(command);

    if let Some((rule, matched)) = first_match(&BLOCKED_COMMANDS, &normalized) {
        tracing::info!(rule = rule.description, matched = %matched, "Blocked command");
        return ValidationResult::block(format!(
            "BLOCKED: {} (matched `{}`)",
            rule.description, matched
        ));
    }

    let mut warnings: Vec<String> = Vec::new();
    for rule in WARNED_COMMANDS.iter() {
        if rule.regex.is_match(&normalized) {
            let warning = format!("WARNING: {}", rule.description);
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
    }

    if warnings.is_empty() {
        ValidationResult::allow()
    } else {
        tracing::debug!(count = warnings.len(), "Command allowed with warnings");
        ValidationResult::allow_with_warnings(warnings)
    }
}
