/// # plurackup CLI Interface (Module)
///
/// Command parsing and orchestration for the `plurackup` binary. All fetching,
/// aggregation and rendering lives in [`plurackup-core`]; this module only turns
/// a config file plus command-line overrides into one call to
/// [`plurackup_core::backup::backup`].
///
/// ## How To Use
/// - From the shell: `plurackup backup --config plurackup.yaml`.
/// - From tests: build a [`Cli`] and call [`run`].
///
/// [`plurackup-core`]: ../../plurackup-core/
use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use plurackup_core::backup::backup;
use plurackup_core::client::PlurkClient;
use plurackup_core::config::{OutputFormat, TimeOffset};
use plurackup_core::contract::PlurkApi;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for plurackup: back up a Plurk timeline.
#[derive(Parser)]
#[clap(
    name = "plurackup",
    version,
    about = "Back up your plurks and their responses to XML and browsable XHTML"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in, fetch every plurk and response, and write the backup files
    Backup {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Output formats, overriding `output.formats` (xml, html; comma separated)
        #[clap(long, value_delimiter = ',')]
        format: Vec<OutputFormat>,
        /// Output path without extension, overriding `output.basename`
        #[clap(long)]
        output: Option<PathBuf>,
        /// Display offset from UTC for the XHTML output, e.g. +8:00
        #[clap(long, allow_hyphen_values = true)]
        timezone: Option<TimeOffset>,
    },
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Backup {
            config,
            format,
            output,
            timezone,
        } => {
            let mut loaded = load_config(config)?;
            if !format.is_empty() {
                loaded.backup.output.formats = format;
            }
            if let Some(output) = output {
                loaded.backup.output.basename = Some(output);
            }
            if let Some(offset) = timezone {
                loaded.backup.output.time_offset = offset;
            }
            loaded.backup.trace_loaded();

            tracing::info!(command = "backup", username = %loaded.credentials.username, "Starting backup");
            let client = PlurkClient::new(loaded.api_key.clone(), &loaded.backup.api)?;
            let api: Arc<dyn PlurkApi> = Arc::new(client);

            match backup(&loaded.backup, api, &loaded.credentials).await {
                Ok(report) => {
                    tracing::info!(command = "backup", ?report, "Backup complete");
                    println!(
                        "Backed up {} plurks and {} responses for {}.",
                        report.plurks, report.responses, report.owner.display_name
                    );
                    for file in &report.files {
                        println!("  {}", file.display());
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "backup", error = %e, "Backup failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
