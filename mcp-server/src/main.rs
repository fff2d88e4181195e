use std::path::PathBuf;

use clap::Parser;
use totara_mcp_server::run_main;

/// Totara LMS natural-language query server speaking MCP over stdin/stdout.
#[derive(Parser)]
#[command(name = "totara-mcp-server", version)]
struct Cli {
    /// Load environment variables from this file instead of ./.env.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            // A missing .env is fine; the environment may already be set.
            dotenvy::dotenv().ok();
        }
    }

    run_main().await
}
