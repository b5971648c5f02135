//! Extractor configuration: keyword sets, the reconstruction table, and the
//! scan limits used by [`crate::extractor::PromptExtractor`].
//!
//! Every field has a default matching the permission menus rendered by the
//! Claude CLI. A JSON file can override any subset of fields; set
//! `PROMPTSCAN_CONFIG` to its path to have [`ExtractorConfig::from_env`] load it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "PROMPTSCAN_CONFIG";

/// Option text containing any of these is a progress/status line, not a choice.
const SKIP_KEYWORDS: &[&str] = &[
    "tokens", "thinking", "running", "waiting", "checking", "nesting", "hatching",
];

/// At least one of these must appear in the options for the menu to count.
const PERMISSION_KEYWORDS: &[&str] = &[
    "yes", "no", "allow", "deny", "approve", "reject", "cancel", "always", "session",
];

/// Lines containing any of these are treated as the prompt's question.
const QUESTION_KEYWORDS: &[&str] = &[
    "permission",
    "wants to",
    "allow",
    "create",
    "edit",
    "run",
    "write",
    "read",
    "execute",
    "proceed",
    "confirm",
    "approve",
    "grant",
];

/// Total positions searched for a question, counting the first option line.
const DEFAULT_QUESTION_LOOKBACK: usize = 20;

/// Lines shorter than this (after trimming) are never a question.
const DEFAULT_MIN_QUESTION_CHARS: usize = 5;

/// Fewest options a menu may have after reconstruction. Configured values
/// below this are raised to it.
pub const MIN_MENU_OPTIONS: usize = 2;

/// Tunable data driving prompt extraction.
///
/// Keyword lists hold lowercase substrings; they are matched against
/// lowercased text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub skip_keywords: Vec<String>,
    pub permission_keywords: Vec<String>,
    pub question_keywords: Vec<String>,
    /// First ordinal seen → synthetic options standing in for the ones that
    /// scrolled off. An entry must supply exactly `first - 1` options.
    pub reconstruction: BTreeMap<u32, Vec<String>>,
    pub question_lookback: usize,
    pub min_question_chars: usize,
    /// Never effectively below [`MIN_MENU_OPTIONS`].
    pub min_options: usize,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let mut reconstruction = BTreeMap::new();
        reconstruction.insert(2, owned(&["Yes"]));
        reconstruction.insert(3, owned(&["Yes", "Approve this time"]));

        Self {
            skip_keywords: owned(SKIP_KEYWORDS),
            permission_keywords: owned(PERMISSION_KEYWORDS),
            question_keywords: owned(QUESTION_KEYWORDS),
            reconstruction,
            question_lookback: DEFAULT_QUESTION_LOOKBACK,
            min_question_chars: DEFAULT_MIN_QUESTION_CHARS,
            min_options: MIN_MENU_OPTIONS,
        }
    }
}

impl ExtractorConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| format!("invalid extractor config: {e}"))?;
        config.normalize();
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        Self::from_json(&text)
    }

    /// Load the file named by `PROMPTSCAN_CONFIG`, or fall back to defaults
    /// when the variable is unset or empty.
    pub fn from_env() -> Result<Self, String> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Synthetic leading options for a block whose first ordinal is `first`.
    ///
    /// `Some(&[])` when nothing is missing (blocks starting at 0 or 1), `None`
    /// when the gap can't be filled.
    #[must_use]
    pub fn reconstruction_for(&self, first: u32) -> Option<&[String]> {
        if first <= 1 {
            return Some(&[]);
        }
        let synthetic = self.reconstruction.get(&first)?;
        let missing = usize::try_from(first).ok()?.checked_sub(1)?;
        (synthetic.len() == missing).then_some(synthetic.as_slice())
    }

    // Keywords are compared against lowercased text, so user-supplied ones
    // must be lowercase too. Empty keywords would match everything.
    fn normalize(&mut self) {
        self.min_options = self.min_options.max(MIN_MENU_OPTIONS);
        for list in [
            &mut self.skip_keywords,
            &mut self.permission_keywords,
            &mut self.question_keywords,
        ] {
            *list = list
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
        }
    }
}
