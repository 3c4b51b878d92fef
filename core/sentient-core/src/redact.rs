//! Secret redaction for anything persisted from free-form host text.

use std::borrow::Cow;

use crate::patterns::SECRET_PATTERNS;

pub const REDACTED: &str = "[REDACTED]";

/// Replaces every recognized secret token with [`REDACTED`].
///
/// Idempotent, and borrows the input unchanged when nothing matches.
pub fn redact_secrets(text: &str) -> Cow<'_, str> {
    let mut result = Cow::Borrowed(text);
    for pattern in SECRET_PATTERNS.iter() {
        if pattern.is_match(&result) {
            result = Cow::Owned(pattern.replace_all(&result, REDACTED).into_owned());
        }
    }
    result
}

/// Cuts `text` to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
