//! DietLens
//!
//! An MCP server for timezone-aware nutrition history.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use dietlens::build_info;
use dietlens::config::AppConfig;
use dietlens::mcp::DietLensService;
use dietlens::source::ApiClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr to not interfere with MCP stdio
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dietlens=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = AppConfig::from_env()?;
    eprintln!("Consumption API: {}", config.api_url);
    eprintln!(
        "Timezone: {}",
        config.timezone.as_deref().unwrap_or("(from TZ, else UTC)")
    );

    let client = ApiClient::new(&config.api_url, config.api_token.clone(), config.request_timeout)?;
    let service = DietLensService::new(config, Arc::new(client));

    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
