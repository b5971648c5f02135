//! Cleaning of raw terminal output into lines the extractor can read.
//!
//! Terminal output from an interactive CLI is full of escape codes, selection
//! cursors, box borders, spinners and status lines. These functions turn one
//! raw line into its visible text and classify the lines worth dropping.

use regex::Regex;
use std::sync::LazyLock;

/// Noise patterns dropped from the line log by default.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    // Spinner glyphs only
    r"^[*+.·•○●◦◉◎⊙⊚⊛⊜⊝]+$",
    // Terminal title updates
    r"^0;",
    // Whimsical status messages
    r"(Vibing|Prestidigitating|Julienning|Pondering|Conjuring)",
    r"thinking\)$",
    // Token counters like "1.7k tokens"
    r"^\d+\.?\d*k? tokens",
    r"^(Checking|Working|Loading|Waiting)",
    // Box drawing only
    r"^[─│┌┐└┘├┤┬┴┼═║╔╗╚╝╠╣╦╩╬╭╮╰╯]+$",
];

static NOISE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DEFAULT_NOISE_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("invalid noise pattern regex"))
        .collect()
});

/// Commands that replace the conversation, so earlier output is stale.
static SESSION_CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^/(compact|resume)\b").expect("invalid session change regex")
});

/// Regex matching ANSI escape sequences (CSI sequences, OSC sequences, etc.).
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    // Matches:
    // - CSI sequences: \x1b[ ... final_byte  (parameters can include 0-9;?<=>!)
    // - OSC sequences: \x1b] ... BEL or ST
    // - Charset selection: \x1b( or \x1b) plus designator
    // - Simple escapes: \x1b followed by a single character
    // - Backspace sequences: char \x08 (overstrike)
    Regex::new(
        r"\x1b\[[0-9;?<=>!]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[()][0-9A-B]|\x1b[@-Z\\-_a-z]|.\x08",
    )
    .expect("invalid ANSI regex")
});

/// Leading selection cursor drawn next to the highlighted menu option.
static CURSOR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[❯>]+\s*").expect("invalid cursor regex"));

static BOX_DRAWING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[─│┌┐└┘├┤┬┴┼═║╔╗╚╝╠╣╦╩╬╭╮╰╯]").expect("invalid box regex"));

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi(s: &str) -> String {
    ANSI_ESCAPE.replace_all(s, "").to_string()
}

/// Remove the selection cursor and box borders from an escape-free line.
///
/// "│ ❯ 1. Yes │" becomes "1. Yes".
#[must_use]
pub fn clean_line(line: &str) -> String {
    let without_box = BOX_DRAWING.replace_all(line, "");
    let trimmed = without_box.trim();
    CURSOR_PREFIX.replace(trimmed, "").trim().to_string()
}

/// True if the line matches one of [`DEFAULT_NOISE_PATTERNS`].
#[must_use]
pub fn is_noise(line: &str) -> bool {
    NOISE_PATTERNS.iter().any(|re| re.is_match(line))
}

/// True for `/compact` or `/resume` typed at the start of a line.
#[must_use]
pub fn is_session_change(line: &str) -> bool {
    SESSION_CHANGE.is_match(line)
}
