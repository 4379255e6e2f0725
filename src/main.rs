//! swarm-bench CLI
//!
//! Ramps up sessions against a target and keeps them alive until interrupted.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    let dashboard = cli.use_dashboard(std::io::stdout().is_terminal());

    // Initialize logging; stderr keeps log lines off the dashboard
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_filter(dashboard))),
        )
        .with_writer(std::io::stderr)
        .init();

    // Run the sessions
    cli.run(dashboard).await?;

    Ok(())
}
