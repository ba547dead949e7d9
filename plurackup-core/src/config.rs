//! Configuration handed to the core by the front-end. Defaults are applied here, at construction.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_SECURE_BASE_URL: &str = "https://www.plurk.com";
pub const DEFAULT_PLAIN_BASE_URL: &str = "http://www.plurk.com";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_STYLESHEET: &str = "style.css";

/// Everything a backup run needs apart from the API client and the credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl BackupConfig {
    pub fn trace_loaded(&self) {
        info!(
            page_size = self.fetch.page_size,
            reply_retry_limit = ?self.fetch.reply_retry_limit,
            formats = ?self.output.formats,
            time_offset = %self.output.time_offset,
            "Loaded BackupConfig"
        );
        debug!(?self, "BackupConfig loaded (full debug)");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Plurks per timeline request; also the fan-out width of one page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// `None` retries malformed response listings forever.
    #[serde(default)]
    pub reply_retry_limit: Option<u32>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            reply_retry_limit: None,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Xml,
    Html,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Html => "html",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" | "x" => Ok(OutputFormat::Xml),
            "html" | "h" => Ok(OutputFormat::Html),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    /// Path without extension; defaults to the account handle.
    #[serde(default)]
    pub basename: Option<PathBuf>,
    #[serde(default = "default_stylesheet")]
    pub stylesheet: PathBuf,
    /// Applied to UTC server times in the XHTML output.
    #[serde(default)]
    pub time_offset: TimeOffset,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            basename: None,
            stylesheet: default_stylesheet(),
            time_offset: TimeOffset::default(),
        }
    }
}

impl OutputConfig {
    /// Base path for output files: the configured basename, else the account handle.
    pub fn base_path(&self, username: &str) -> PathBuf {
        self.basename
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(username))
    }
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Html]
}

fn default_stylesheet() -> PathBuf {
    PathBuf::from(DEFAULT_STYLESHEET)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Used for login.
    #[serde(default = "default_secure_base_url")]
    pub secure_base_url: String,
    /// Used for every other call.
    #[serde(default = "default_plain_base_url")]
    pub plain_base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            secure_base_url: default_secure_base_url(),
            plain_base_url: default_plain_base_url(),
        }
    }
}

fn default_secure_base_url() -> String {
    DEFAULT_SECURE_BASE_URL.to_string()
}

fn default_plain_base_url() -> String {
    DEFAULT_PLAIN_BASE_URL.to_string()
}

/// A signed `hh:mm` offset from UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOffset {
    pub negative: bool,
    pub hours: u32,
    pub minutes: u32,
}

impl TimeOffset {
    pub fn new(negative: bool, hours: u32, minutes: u32) -> Self {
        Self {
            negative,
            hours,
            minutes,
        }
    }

    pub fn as_duration(&self) -> Duration {
        let magnitude = Duration::hours(self.hours as i64) + Duration::minutes(self.minutes as i64);
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Shifts a UTC instant into local wall-clock time.
    pub fn apply(&self, time: &DateTime<Utc>) -> NaiveDateTime {
        time.naive_utc() + self.as_duration()
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { '-' } else { '+' };
        write!(f, "{sign}{}:{:02}", self.hours, self.minutes)
    }
}

impl FromStr for TimeOffset {
    type Err = String;

    /// Accepts `[+-]h`, `[+-]hh`, `[+-]hh:m` and `[+-]hh:mm`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static OFFSET: OnceLock<Regex> = OnceLock::new();
        let re = OFFSET.get_or_init(|| {
            Regex::new(r"^([+-]?)(\d\d?)(?::(\d\d?))?$").expect("static regex")
        });
        let caps = re
            .captures(s.trim())
            .ok_or_else(|| format!("invalid timezone offset {s:?}, expected ±hh:mm"))?;
        let negative = caps.get(1).map(|m| m.as_str()) == Some("-");
        let hours: u32 = caps[2].parse().map_err(|e| format!("invalid hours: {e}"))?;
        let minutes: u32 = match caps.get(3) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|e| format!("invalid minutes: {e}"))?,
            None => 0,
        };
        if minutes >= 60 {
            return Err(format!("invalid minutes in offset {s:?}"));
        }
        Ok(TimeOffset::new(negative, hours, minutes))
    }
}

impl TryFrom<String> for TimeOffset {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOffset> for String {
    fn from(value: TimeOffset) -> Self {
        value.to_string()
    }
}
