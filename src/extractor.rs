//! Permission prompt extraction from the tail of a terminal line buffer.
//!
//! The extractor scans backward from the newest line for a contiguous block of
//! numbered options ("1. Yes", "2) No"), validates that block as a permission
//! menu, fills in leading options that scrolled out of the buffer, and looks a
//! short distance above the block for the question being asked.
//!
//! Everything here is a pure function of its input. "No prompt" is reported as
//! `None` from [`PromptExtractor::extract`]; [`PromptExtractor::inspect`] gives
//! the reason instead.

use crate::config::{ExtractorConfig, MIN_MENU_OPTIONS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// A numbered line: ordinal, `.` or `)`, whitespace, then the option text.
/// Ordinals may use any Unicode decimal digits ("١. Yes").
static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[.)]\s+(.+)").expect("invalid option regex"));

static DECIMAL_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d$").expect("invalid digit regex"));

/// One numbered choice as printed in the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOption {
    pub ordinal: u32,
    pub text: String,
}

/// A detected permission prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResult {
    /// The line asking the question, if one was found near the options.
    pub question: Option<String>,
    /// Option texts in menu order, ordinals stripped.
    pub options: Vec<String>,
}

/// A detected prompt plus where its pieces came from in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMatch {
    pub question: Option<String>,
    /// Every option, reconstructed ones included, ordinals intact.
    pub options: Vec<CandidateOption>,
    /// Buffer index of the question line.
    pub question_line: Option<usize>,
    /// Buffer indices of the options that were actually scanned.
    pub option_lines: Vec<usize>,
    /// The lowest ordinal present in the buffer.
    pub first_found_ordinal: u32,
    /// How many leading options were synthesized.
    pub reconstructed: usize,
}

impl PromptMatch {
    #[must_use]
    pub fn into_result(self) -> PromptResult {
        PromptResult {
            question: self.question,
            options: self.options.into_iter().map(|o| o.text).collect(),
        }
    }
}

/// Why a buffer was not recognized as a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyInput,
    NoOptions,
    NotContiguous,
    Unreconstructable { first: u32 },
    TooFewOptions,
    NotPermissionRelated,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "no lines to scan"),
            Self::NoOptions => write!(f, "no numbered options found"),
            Self::NotContiguous => write!(f, "option numbers are not consecutive"),
            Self::Unreconstructable { first } => {
                write!(f, "options start at {first}; too many leading options missing")
            }
            Self::TooFewOptions => write!(f, "fewer than two options"),
            Self::NotPermissionRelated => write!(f, "options are not permission-related"),
        }
    }
}

/// Heuristic permission prompt detector.
#[derive(Debug, Clone, Default)]
pub struct PromptExtractor {
    config: ExtractorConfig,
}

/// Detect a prompt using the default configuration.
#[must_use]
pub fn extract<S: AsRef<str>>(lines: &[S]) -> Option<PromptResult> {
    PromptExtractor::default().extract(lines)
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// Value of a Unicode decimal digit.
///
/// Decimal digits are encoded in contiguous runs of ten starting at zero, so
/// the value is the offset from the start of the run of digits containing `c`.
fn digit_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut zero = u32::from(c);
    while let Some(prev) = zero.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        zero -= 1;
    }
    Some((u32::from(c) - zero) % 10)
}

/// Numeric value of a digit run, saturating at `u32::MAX`.
///
/// A saturated ordinal never passes contiguity or reconstruction, so an
/// oversized number still ends up rejecting the block.
fn parse_ordinal(digits: &str) -> u32 {
    digits
        .chars()
        .filter_map(digit_value)
        .try_fold(0u32, |acc, d| acc.checked_mul(10)?.checked_add(d))
        .unwrap_or(u32::MAX)
}

impl PromptExtractor {
    #[must_use]
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Detect a permission prompt in `lines` (oldest first).
    #[must_use]
    pub fn extract<S: AsRef<str>>(&self, lines: &[S]) -> Option<PromptResult> {
        self.inspect(lines).ok().map(PromptMatch::into_result)
    }

    /// Like [`extract`](Self::extract), but reports why detection failed and
    /// where the prompt's lines sit in the buffer when it succeeds.
    pub fn inspect<S: AsRef<str>>(&self, lines: &[S]) -> Result<PromptMatch, Rejection> {
        if lines.is_empty() {
            return Err(Rejection::EmptyInput);
        }

        let (scanned, option_lines) = self.scan_options(lines);
        let first = scanned.first().ok_or(Rejection::NoOptions)?.ordinal;

        let contiguous = scanned
            .windows(2)
            .all(|pair| pair[0].ordinal.checked_add(1) == Some(pair[1].ordinal));
        if !contiguous {
            return Err(Rejection::NotContiguous);
        }

        let synthetic = self
            .config
            .reconstruction_for(first)
            .ok_or(Rejection::Unreconstructable { first })?;
        let reconstructed = synthetic.len();
        let options: Vec<CandidateOption> = (1..)
            .zip(synthetic)
            .map(|(ordinal, text)| CandidateOption {
                ordinal,
                text: text.clone(),
            })
            .chain(scanned)
            .collect();

        if options.len() < self.config.min_options.max(MIN_MENU_OPTIONS) {
            return Err(Rejection::TooFewOptions);
        }

        let all_text = options
            .iter()
            .map(|o| o.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if !contains_any(&all_text, &self.config.permission_keywords) {
            return Err(Rejection::NotPermissionRelated);
        }

        let question = self.find_question(lines, option_lines[0]);

        Ok(PromptMatch {
            question_line: question.as_ref().map(|(i, _)| *i),
            question: question.map(|(_, q)| q),
            options,
            option_lines,
            first_found_ordinal: first,
            reconstructed,
        })
    }

    /// Walk backward collecting the trailing block of numbered lines.
    ///
    /// Non-numbered lines are skipped until the first option is accepted;
    /// after that the first non-numbered line ends the block.
    fn scan_options<S: AsRef<str>>(&self, lines: &[S]) -> (Vec<CandidateOption>, Vec<usize>) {
        let mut options = Vec::new();
        let mut indices = Vec::new();

        for (i, line) in lines.iter().enumerate().rev() {
            let line = line.as_ref().trim_end();
            let Some(caps) = OPTION_LINE.captures(line) else {
                if options.is_empty() {
                    continue;
                }
                break;
            };

            let digits = &caps[1];
            let text = &caps[2];

            // Status lines like "1.7k tokens" that slipped past the pattern.
            if contains_any(&text.to_lowercase(), &self.config.skip_keywords) {
                continue;
            }
            if digits.contains('.') {
                continue;
            }

            options.push(CandidateOption {
                ordinal: parse_ordinal(digits),
                text: text.to_string(),
            });
            indices.push(i);
        }

        // Collected newest-first.
        options.reverse();
        indices.reverse();
        (options, indices)
    }

    /// Nearest qualifying line above `first_option`, within the lookback window.
    fn find_question<S: AsRef<str>>(
        &self,
        lines: &[S],
        first_option: usize,
    ) -> Option<(usize, String)> {
        let span = self.config.question_lookback.saturating_sub(1);
        let lowest = first_option.saturating_sub(span);

        (lowest..first_option).rev().find_map(|i| {
            let line = lines[i].as_ref().trim_end();
            if line.trim().chars().count() < self.config.min_question_chars {
                return None;
            }
            let is_question = line.ends_with('?')
                || contains_any(&line.to_lowercase(), &self.config.question_keywords);
            is_question.then(|| (i, line.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_stops_at_first_gap_in_block() {
        let lines = ["1. Old", "prose", "1. Yes", "2. No"];
        let (options, indices) = PromptExtractor::default().scan_options(&lines);
        assert_eq!(indices, vec![2, 3]);
        assert_eq!(options[0].ordinal, 1);
        assert_eq!(options[1].text, "No");
    }

    #[test]
    fn oversized_ordinal_joins_block_saturated() {
        let lines = ["1. Yes", "2. No", "99999999999. Deny"];
        let (options, indices) = PromptExtractor::default().scan_options(&lines);
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(options[2].ordinal, u32::MAX);
    }

    #[test]
    fn unicode_digit_values() {
        assert_eq!(digit_value('7'), Some(7));
        assert_eq!(digit_value('٣'), Some(3));
        assert_eq!(digit_value('０'), Some(0));
        assert_eq!(digit_value('９'), Some(9));
        // Mathematical digits are five adjacent runs of ten.
        assert_eq!(digit_value('\u{1D7D8}'), Some(0));
        assert_eq!(digit_value('\u{1D7FF}'), Some(9));
        assert_eq!(digit_value('x'), None);
        assert_eq!(parse_ordinal("١٢"), 12);
        assert_eq!(parse_ordinal("4294967296"), u32::MAX);
    }

    #[test]
    fn lookback_clamps_at_buffer_start() {
        let lines = ["Allow this?", "1. Yes", "2. No"];
        let found = PromptExtractor::default().find_question(&lines, 1);
        assert_eq!(found, Some((0, "Allow this?".to_string())));
    }
}
