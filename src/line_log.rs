//! Rolling buffer of cleaned terminal lines.
//!
//! [`LineLog`] receives raw terminal output in arbitrary chunks, reassembles
//! complete lines, cleans them (see [`crate::output`]) and keeps the most
//! recent `max_lines` of them. Its tail is what gets handed to the extractor.
//!
//! The log is not synchronized; the server keeps it behind a mutex.

use crate::output;
use regex::Regex;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

/// Default number of lines retained.
pub const DEFAULT_MAX_LINES: usize = 500;

/// "  12: text" as written by [`LineLog::save_to_file`].
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+:\s*(.*)").expect("invalid numbered line regex"));

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("invalid line break regex"));

/// A fixed-capacity log of cleaned terminal output lines.
#[derive(Debug)]
pub struct LineLog {
    max_lines: usize,
    lines: VecDeque<String>,
    /// Raw bytes after the last line break, including any multibyte
    /// character split across chunks.
    partial: Vec<u8>,
    /// `None` uses [`output::is_noise`].
    skip_patterns: Option<Vec<Regex>>,
    session_change_pending: bool,
}

impl Default for LineLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl LineLog {
    /// Create an empty log filtering the default noise patterns.
    #[must_use]
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines,
            lines: VecDeque::with_capacity(max_lines.min(DEFAULT_MAX_LINES)),
            partial: Vec::new(),
            skip_patterns: None,
            session_change_pending: false,
        }
    }

    /// Create an empty log filtering `patterns` instead of the defaults.
    pub fn with_skip_patterns(max_lines: usize, patterns: &[&str]) -> Result<Self, String> {
        let compiled = patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| format!("invalid skip pattern {p:?}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            skip_patterns: Some(compiled),
            ..Self::new(max_lines)
        })
    }

    /// Feed a chunk of raw terminal output.
    ///
    /// Chunks may split lines, or UTF-8 sequences, anywhere; bytes after the
    /// last line break are held until a later chunk completes the line.
    /// Invalid UTF-8 in a complete line is replaced.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.partial.extend_from_slice(data);
        let Some(end) = self.partial.iter().rposition(|b| matches!(b, b'\r' | b'\n')) else {
            return;
        };

        let rest = self.partial.split_off(end + 1);
        let complete = std::mem::replace(&mut self.partial, rest);
        let text = String::from_utf8_lossy(&complete);
        for part in LINE_BREAKS.split(&text) {
            self.push_line(part);
        }
    }

    /// Feed text; see [`push_bytes`](Self::push_bytes).
    pub fn push_str(&mut self, data: &str) {
        self.push_bytes(data.as_bytes());
    }

    fn push_line(&mut self, raw: &str) {
        let clean = output::clean_line(&output::strip_ansi(raw));
        if clean.is_empty() {
            return;
        }

        // Checked before noise filtering so a skipped line can't hide it.
        if output::is_session_change(&clean) {
            tracing::debug!(line = %clean, "session change command seen");
            self.session_change_pending = true;
        }

        if self.is_skipped(&clean) {
            return;
        }

        if self.max_lines == 0 {
            return;
        }
        if self.lines.len() == self.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(clean);
    }

    fn is_skipped(&self, line: &str) -> bool {
        match &self.skip_patterns {
            Some(patterns) => patterns.iter().any(|re| re.is_match(line)),
            None => output::is_noise(line),
        }
    }

    /// Whether a `/compact` or `/resume` was seen since the last acknowledgement.
    #[must_use]
    pub fn session_change_pending(&self) -> bool {
        self.session_change_pending
    }

    /// Clear the session change flag, returning its previous value.
    pub fn acknowledge_session_change(&mut self) -> bool {
        std::mem::replace(&mut self.session_change_pending, false)
    }

    /// The most recent `n` lines, oldest first.
    #[must_use]
    pub fn last_n(&self, n: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(skip).cloned().collect()
    }

    /// All retained lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Write the log with 4-wide line numbers, creating parent directories.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }

        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            let _ = writeln!(out, "{i:4}: {line}");
        }
        std::fs::write(path, out).map_err(|e| format!("failed to write {}: {e}", path.display()))
    }
}

/// Read a saved line log back into lines, oldest first.
///
/// `#` comment lines and lines without a number prefix are ignored. With
/// `tail`, only the last `tail` lines are returned.
pub fn read_line_log(path: impl AsRef<Path>, tail: Option<usize>) -> Result<Vec<String>, String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read line log {}: {e}", path.display()))?;

    let mut lines: Vec<String> = text
        .lines()
        .filter(|l| !l.starts_with('#'))
        .filter_map(|l| NUMBERED_LINE.captures(l).map(|c| c[1].to_string()))
        .collect();

    if let Some(tail) = tail {
        let skip = lines.len().saturating_sub(tail);
        lines.drain(..skip);
    }
    Ok(lines)
}
