use anyhow::Result;
use clap::Parser;
use plurackup::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a .env file next to the config.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "plurackup starting");

    let cli = Cli::parse();
    tracing::debug!("Arguments parsed");
    let result = run(cli).await;
    match &result {
        Ok(()) => tracing::info!("Backup finished"),
        Err(e) => tracing::error!(error = %e, "Backup failed"),
    }
    result
}
