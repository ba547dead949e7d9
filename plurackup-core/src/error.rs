//! Error types for the backup pipeline.

use thiserror::Error;

/// Failures talking to the remote API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS or body read failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any non-success status outside the 4xx range.
    #[error("Unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Body was not the JSON we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A `posted` field did not match the server time format.
    #[error("Invalid timestamp {raw:?}: {source}")]
    Timestamp {
        raw: String,
        source: chrono::ParseError,
    },
}

/// Failures writing output files.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `write_posts` or `postpare` called without a successful `prepare`.
    #[error("Renderer for {0} was not prepared")]
    NotPrepared(String),
}

/// Fatal outcomes of a backup run.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Login returned an `error_text`.
    #[error("Login failed: {0}")]
    Authentication(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    /// Only raised when a reply retry limit is configured.
    #[error("Responses for plurk {plurk_id} still malformed after {attempts} attempts: {reason}")]
    RepliesExhausted {
        plurk_id: i64,
        attempts: u32,
        reason: String,
    },

    #[error("Reply fetch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration selected no output format.
    #[error("No output format selected")]
    NoOutputFormat,
}
