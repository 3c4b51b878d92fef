//! Hook payload ingestion.
//!
//! The host hands over one JSON payload, either in `CLAUDE_HOOK_INPUT` or on
//! stdin. The source is picked once at startup and read at most once.

use std::env;
use std::io::{self, Read};

use sentient_hook_protocol::{HookInput, HOOK_INPUT_ENV, MAX_INPUT_BYTES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Payload passed through the environment.
    Env(String),
    Stdin,
}

impl InputSource {
    pub fn detect() -> Self {
        match env::var(HOOK_INPUT_ENV) {
            Ok(raw) if !raw.trim().is_empty() => InputSource::Env(raw),
            _ => InputSource::Stdin,
        }
    }

    /// Reads the raw payload, capped at [`MAX_INPUT_BYTES`].
    pub fn read_raw(self) -> String {
        match self {
            InputSource::Env(raw) => truncate_bytes(raw, MAX_INPUT_BYTES),
            InputSource::Stdin => {
                let mut buf = Vec::new();
                if let Err(e) = io::stdin()
                    .lock()
                    .take(MAX_INPUT_BYTES as u64)
                    .read_to_end(&mut buf)
                {
                    tracing::warn!(error = %e, "Failed to read stdin");
                }
                String::from_utf8_lossy(&buf).into_owned()
            }
        }
    }

    pub fn read(self) -> HookInput {
        let raw = self.read_raw();
        tracing::debug!(bytes = raw.len(), "Read hook input");
        HookInput::parse(&raw)
    }
}

fn truncate_bytes(mut raw: String, max: usize) -> String {
    if raw.len() > max {
        let mut cut = max;
        while !raw.is_char_boundary(cut) {
            cut -= 1;
        }
        raw.truncate(cut);
    }
    raw
}
