//! MCP server: tool definitions using rmcp macros.
//!
//! Defines `PromptScanServer` with MCP tools for:
//! - One-shot detection: `extract_prompt` on caller-supplied lines
//! - A server-held line buffer: `append_output`, `detect_prompt`, `save_buffer`,
//!   `acknowledge_session_change`
//! - Saved logs: `scan_line_log`

use crate::config::ExtractorConfig;
use crate::extractor::{PromptExtractor, Rejection};
use crate::line_log::{self, LineLog};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::schemars;
use rmcp::tool;
use rmcp::tool_handler;
use rmcp::tool_router;
use rmcp::{ErrorData as McpError, ServerHandler};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default number of buffered lines handed to the extractor.
const DEFAULT_DETECT_TAIL: usize = 50;

// ---------------------------------------------------------------------------
// Parameter structs (deserialized from MCP tool call arguments)
// ---------------------------------------------------------------------------

/// Parameters for the `extract_prompt` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ExtractPromptParams {
    /// Terminal lines, oldest first, with escape codes already stripped.
    pub lines: Vec<String>,
}

/// Parameters for the `append_output` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AppendOutputParams {
    /// Raw terminal output. May contain escape codes and partial lines.
    pub data: String,
}

/// Parameters for the `detect_prompt` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct DetectPromptParams {
    /// Number of most recent buffered lines to scan. Defaults to 50.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<usize>,
}

/// Parameters for the `scan_line_log` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ScanLineLogParams {
    /// Path to a line log written by `save_buffer`.
    pub path: String,
    /// Only scan the last N lines of the log. Defaults to all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<usize>,
}

/// Parameters for the `save_buffer` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SaveBufferParams {
    /// Destination file. Parent directories are created.
    pub path: String,
}

// ---------------------------------------------------------------------------
// Result structs (serialized to JSON and returned as tool content)
// ---------------------------------------------------------------------------

/// Outcome of running the extractor over a set of lines.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    pub detected: bool,
    pub question: Option<String>,
    pub options: Vec<String>,
    /// Why nothing was detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub lines_scanned: usize,
}

impl DetectionResult {
    fn from_scan<S: AsRef<str>>(extractor: &PromptExtractor, lines: &[S]) -> Self {
        let lines_scanned = lines.len();
        match extractor.inspect(lines) {
            Ok(found) => {
                tracing::info!(
                    options = found.options.len(),
                    reconstructed = found.reconstructed,
                    has_question = found.question.is_some(),
                    "permission prompt detected"
                );
                let prompt = found.into_result();
                Self {
                    detected: true,
                    question: prompt.question,
                    options: prompt.options,
                    reason: None,
                    lines_scanned,
                }
            }
            Err(rejection) => Self::absent(rejection, lines_scanned),
        }
    }

    fn absent(rejection: Rejection, lines_scanned: usize) -> Self {
        tracing::debug!(reason = %rejection, lines_scanned, "no permission prompt");
        Self {
            detected: false,
            question: None,
            options: Vec::new(),
            reason: Some(rejection.to_string()),
            lines_scanned,
        }
    }
}

/// Buffer state after `append_output`.
#[derive(Debug, Clone, Serialize)]
struct BufferStatus {
    buffered_lines: usize,
    session_change_pending: bool,
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

/// The promptscan MCP server.
///
/// Holds one [`PromptExtractor`] and a shared [`LineLog`] that callers feed
/// with `append_output`.
#[derive(Clone)]
pub struct PromptScanServer {
    extractor: Arc<PromptExtractor>,
    buffer: Arc<Mutex<LineLog>>,
    tool_router: ToolRouter<PromptScanServer>,
}

impl PromptScanServer {
    /// Create a server with the default extractor configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    /// Create a server using `config` for every detection.
    #[must_use]
    pub fn with_config(config: ExtractorConfig) -> Self {
        Self {
            extractor: Arc::new(PromptExtractor::new(config)),
            buffer: Arc::new(Mutex::new(LineLog::default())),
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for PromptScanServer {
    fn default() -> Self {
        Self::new()
    }
}

fn json_content<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("JSON serialization error: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn err_result(msg: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.into())]))
}

#[tool_router]
impl PromptScanServer {
    #[tool(
        description = "Detect a numbered permission prompt (e.g. '1. Yes / 2. No / 3. Always allow') in the given terminal lines, oldest first. Returns detected, the question line if one was found, and the option texts in menu order. Options that scrolled off the top are reconstructed when possible. When nothing is detected, `reason` says why."
    )]
    async fn extract_prompt(
        &self,
        Parameters(params): Parameters<ExtractPromptParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(lines = params.lines.len(), "extract_prompt");
        json_content(&DetectionResult::from_scan(&self.extractor, &params.lines))
    }

    #[tool(
        description = "Append raw terminal output to the server's line buffer. Escape codes, selection cursors, box borders, spinners and status lines are removed; partial lines are held until completed. Returns the number of buffered lines and whether a /compact or /resume was seen."
    )]
    async fn append_output(
        &self,
        Parameters(params): Parameters<AppendOutputParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut buffer = self.buffer.lock().await;
        buffer.push_str(&params.data);
        tracing::debug!(bytes = params.data.len(), lines = buffer.len(), "append_output");
        json_content(&BufferStatus {
            buffered_lines: buffer.len(),
            session_change_pending: buffer.session_change_pending(),
        })
    }

    #[tool(
        description = "Run prompt detection over the most recent lines of the server's buffer (default 50). Same result shape as extract_prompt."
    )]
    async fn detect_prompt(
        &self,
        Parameters(params): Parameters<DetectPromptParams>,
    ) -> Result<CallToolResult, McpError> {
        let tail = params.tail.unwrap_or(DEFAULT_DETECT_TAIL);
        let lines = self.buffer.lock().await.last_n(tail);
        tracing::info!(tail, lines = lines.len(), "detect_prompt");
        json_content(&DetectionResult::from_scan(&self.extractor, &lines))
    }

    #[tool(
        description = "Run prompt detection over a line log file previously written by save_buffer ('NNNN: text' per line). Set tail to only scan the last N lines."
    )]
    async fn scan_line_log(
        &self,
        Parameters(params): Parameters<ScanLineLogParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(path = %params.path, tail = ?params.tail, "scan_line_log");
        match line_log::read_line_log(&params.path, params.tail) {
            Ok(lines) => json_content(&DetectionResult::from_scan(&self.extractor, &lines)),
            Err(e) => {
                tracing::warn!(path = %params.path, error = %e, "scan_line_log failed");
                err_result(e)
            }
        }
    }

    #[tool(
        description = "Write the server's line buffer to a file with line numbers, for later inspection or scan_line_log."
    )]
    async fn save_buffer(
        &self,
        Parameters(params): Parameters<SaveBufferParams>,
    ) -> Result<CallToolResult, McpError> {
        let buffer = self.buffer.lock().await;
        tracing::info!(path = %params.path, lines = buffer.len(), "save_buffer");
        match buffer.save_to_file(&params.path) {
            Ok(()) => json_content(&serde_json::json!({"path": params.path, "lines": buffer.len()})),
            Err(e) => err_result(e),
        }
    }

    #[tool(
        description = "Clear the pending session-change flag raised when /compact or /resume appears in the buffer. Returns whether it was set."
    )]
    async fn acknowledge_session_change(&self) -> Result<CallToolResult, McpError> {
        let was_pending = self.buffer.lock().await.acknowledge_session_change();
        json_content(&serde_json::json!({"was_pending": was_pending}))
    }
}

#[tool_handler]
impl ServerHandler for PromptScanServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "promptscan".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "promptscan detects interactive permission prompts in terminal output.\n\n\
                 ONE-SHOT: extract_prompt takes lines you already have (oldest first).\n\n\
                 STREAMING: feed raw output with append_output, then call detect_prompt to scan \
                 the buffer tail. Re-run detect_prompt on later output when nothing is detected; \
                 a prompt is only reported once its numbered options are visible. \
                 If append_output reports session_change_pending, earlier output belongs to a \
                 replaced conversation; call acknowledge_session_change once handled.\n\n\
                 RESULT: detected, question (may be null), options in menu order, and a reason \
                 when nothing was detected."
                    .to_string(),
            ),
        }
    }
}
