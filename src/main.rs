use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use semgate::config::Config;
use semgate::generator::{SqlGenerator, openai::OpenAiGenerator};
use semgate::mcp::server::{McpContext, McpServer};

#[derive(Parser)]
#[command(name = "semgate", version, about = "Semantic SQL gateway MCP server")]
struct Args {
    /// Path to config.json (defaults to ./config.json)
    #[arg(long, default_value = "")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the MCP transport; all logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("Starting semgate MCP server...");

    let config = Config::load(&args.config)?;
    config.validate()?;
    let config = Arc::new(config);

    let generator: Option<Arc<dyn SqlGenerator>> = match OpenAiGenerator::from_env(&config.llm) {
        Ok(g) => Some(Arc::new(g)),
        Err(e) => {
            tracing::warn!("text2sql disabled: {e}");
            None
        }
    };

    let ctx = McpContext { config, generator };

    let server = McpServer::new(ctx);
    server.start().await?;

    Ok(())
}
