//! Entry point for the promptscan MCP server.
//!
//! Initializes tracing (to stderr, so it doesn't interfere with MCP stdio transport),
//! loads the extractor config, and serves on stdin/stdout.

use anyhow::{Result, anyhow};
use promptscan::config::ExtractorConfig;
use promptscan::server::PromptScanServer;
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing to stderr (stdout is used for MCP JSON-RPC).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting promptscan MCP server v{}", env!("CARGO_PKG_VERSION"));

    let config = ExtractorConfig::from_env().map_err(|e| anyhow!(e))?;
    tracing::info!(
        permission_keywords = config.permission_keywords.len(),
        reconstruction_entries = config.reconstruction.len(),
        question_lookback = config.question_lookback,
        "extractor config loaded"
    );

    let server = PromptScanServer::with_config(config);
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    service.waiting().await?;
    tracing::info!("promptscan server shut down");
    Ok(())
}
