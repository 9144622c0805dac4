//! MCP Server setup using `rmcp` with stdio transport.
//!
//! Provides `McpContext` (shared state) and `McpServer` (startup logic).
use crate::mcp::tools::AppTools;
use anyhow::{Context, Result};
use rmcp::{ServiceExt, handler::server::router::Router, transport::io::stdio};
use std::sync::Arc;

use crate::config::Config;
use crate::generator::SqlGenerator;

/// Shared application context available to all tool handlers.
///
/// Requests are stateless: no store connection lives here; every call
/// resolves the store path and opens its own connection.
#[derive(Clone)]
pub struct McpContext {
    pub config: Arc<Config>,
    /// `None` when no LLM backend is configured; the `text2sql` tool
    /// reports this as a client-visible error.
    pub generator: Option<Arc<dyn SqlGenerator>>,
}

/// MCP Server wrapping the context and serving via stdio.
#[derive(Clone)]
pub struct McpServer {
    pub ctx: McpContext,
}

impl McpServer {
    pub fn new(ctx: McpContext) -> Self {
        Self { ctx }
    }

    /// Start the MCP server on stdio transport (blocks until the client disconnects).
    pub async fn start(self) -> Result<()> {
        tracing::info!("Starting MCP server on stdio...");
        let (stdin, stdout) = stdio();

        let app_tools = AppTools::new(self.ctx.clone());
        let router = Router::new(app_tools.clone()).with_tools(app_tools.tool_router.clone());

        router
            .serve((stdin, stdout))
            .await
            .context("MCP Server encountered an error during stdio transport")?;

        Ok(())
    }
}
