//! Top-level pipeline: login → paginate → join → logout → render.
//!
//! # Error Handling
//! A rejected login or any transport failure aborts the run before anything is
//! written. Once fetching has finished, the only remaining failures are I/O
//! errors from the renderers.
//!
//! # Concurrency
//! The run is one sequential flow plus one task per fetched plurk. Under the
//! default [`RetryPolicy`] a plurk whose responses never decode keeps its task
//! retrying forever, and the join never completes; configure
//! `fetch.reply_retry_limit` to turn that into [`BackupError::RepliesExhausted`].

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::aggregate::Aggregator;
use crate::config::{BackupConfig, OutputConfig, OutputFormat};
use crate::contract::{LoginOutcome, PlurkApi, Renderer};
use crate::error::BackupError;
use crate::model::Identity;
use crate::paginate::{collect, initial_cutoff};
use crate::render::{CompositeRenderer, HtmlRenderer, XmlRenderer};
use crate::replies::RetryPolicy;

/// Account credentials, supplied by the front-end.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub owner: Identity,
    pub pages: usize,
    pub plurks: usize,
    pub responses: usize,
    pub identities: usize,
    pub files: Vec<PathBuf>,
}

/// Builds the renderers selected in `output`. The XHTML one is headed with `owner`.
pub fn build_renderers(
    output: &OutputConfig,
    owner: &Identity,
) -> Result<(CompositeRenderer, Vec<PathBuf>), BackupError> {
    if output.formats.is_empty() {
        return Err(BackupError::NoOutputFormat);
    }
    let base = output.base_path(&owner.handle);
    let mut composite = CompositeRenderer::new();
    let mut files = Vec::new();

    let mut seen = Vec::new();
    for &format in &output.formats {
        if seen.contains(&format) {
            continue;
        }
        seen.push(format);
        match format {
            OutputFormat::Xml => {
                let renderer = XmlRenderer::new(&base);
                files.push(renderer.path().to_path_buf());
                composite.attach(Box::new(renderer));
            }
            OutputFormat::Html => {
                let renderer = HtmlRenderer::new(
                    &base,
                    owner.clone(),
                    output.time_offset,
                    &output.stylesheet,
                );
                files.push(renderer.path().to_path_buf());
                composite.attach(Box::new(renderer));
            }
        }
    }
    Ok((composite, files))
}

/// Runs a complete backup against `api` and writes the configured outputs.
pub async fn backup(
    config: &BackupConfig,
    api: Arc<dyn PlurkApi>,
    credentials: &Credentials,
) -> Result<BackupReport, BackupError> {
    if config.output.formats.is_empty() {
        error!("No output format selected");
        return Err(BackupError::NoOutputFormat);
    }

    info!(username = %credentials.username, "Logging in");
    let owner = match api.login(&credentials.username, &credentials.password).await? {
        LoginOutcome::Authenticated(owner) => owner,
        LoginOutcome::Rejected(reason) => {
            error!(reason = %reason, "Login failed");
            return Err(BackupError::Authentication(reason));
        }
    };
    info!(display_name = %owner.display_name, "Login was successful");

    let policy = match config.fetch.reply_retry_limit {
        Some(limit) => RetryPolicy::limited(limit),
        None => RetryPolicy::forever(),
    };

    info!("Begin to fetch plurks and responses");
    let mut aggregator = Aggregator::new();
    let pages = collect(
        Arc::clone(&api),
        &mut aggregator,
        config.fetch.page_size,
        policy,
        initial_cutoff(Utc::now()),
    )
    .await?;

    info!("Fetching is done. Logging out");
    api.logout().await?;

    let plurks = aggregator.posts().len();
    let responses = aggregator.reply_count();
    let identities = aggregator.directory().len();

    let (mut renderers, files) = build_renderers(&config.output, &owner)?;
    info!(plurks, responses, identities, "Writing to file");
    renderers.prepare()?;
    aggregator.flush(&mut renderers)?;
    renderers.postpare()?;

    info!(files = ?files, "Backup complete");
    Ok(BackupReport {
        owner,
        pages,
        plurks,
        responses,
        identities,
        files,
    })
}
