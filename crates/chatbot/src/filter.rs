//! Decide whether a message is a command worth forwarding.

/// Character that starts a command, as in `!ping`.
pub const COMMAND_PREFIX: u8 = b'!';

/// Standalone token that opts a message out of processing.
pub const SKIP_MARKER: &str = "!skip";

/// Why a message was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No `!` followed by a word character anywhere in the text.
    NoCommand,
    /// The text contains a standalone `!skip` token.
    SkipMarker,
}

impl SkipReason {
    /// Human-readable explanation sent back as the synthetic skipped reply.
    pub fn describe(self, message: &str) -> String {
        match self {
            Self::NoCommand => format!("No command found on\n\"{message}\". Skipping."),
            Self::SkipMarker => format!("\"{SKIP_MARKER}\" found on\n\"{message}\". Skipping."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Forward,
    Skip(SkipReason),
}

/// Classify message text. Pure: the same text always yields the same result.
pub fn classify(text: &str) -> Classification {
    if !has_command(text) {
        Classification::Skip(SkipReason::NoCommand)
    } else if has_skip_marker(text) {
        Classification::Skip(SkipReason::SkipMarker)
    } else {
        Classification::Forward
    }
}

/// `!` immediately followed by an ASCII word character.
pub fn has_command(text: &str) -> bool {
    text.as_bytes()
        .windows(2)
        .any(|w| w[0] == COMMAND_PREFIX && (w[1].is_ascii_alphanumeric() || w[1] == b'_'))
}

/// `!skip` bounded by whitespace or the ends of the text.
pub fn has_skip_marker(text: &str) -> bool {
    text.split_whitespace().any(|token| token == SKIP_MARKER)
}
