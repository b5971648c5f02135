//! Detection of interactive permission prompts in scrolling terminal output.
//!
//! [`extractor`] holds the detector itself; [`line_log`] and [`output`] turn raw
//! terminal bytes into the line buffer it reads; [`server`] exposes both over MCP.

pub mod config;
pub mod extractor;
pub mod line_log;
pub mod output;
pub mod server;

pub use config::ExtractorConfig;
pub use extractor::{PromptExtractor, PromptResult, extract};
