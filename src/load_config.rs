/// `load_config` module: reads the static YAML config and injects the account secrets from the environment.
///
/// This is the only place where user-supplied YAML is parsed. The result carries a fully
/// defaulted [`BackupConfig`] for the core plus the [`Credentials`] and API key for the client.
///
/// # Schema
/// ```yaml
/// account:
///   username: alice
/// fetch:
///   page_size: 50
///   reply_retry_limit: 10   # omit to retry forever
/// output:
///   formats: [xml, html]
///   basename: backups/alice
///   stylesheet: style.css
///   time_offset: "+8:00"
/// api:
///   secure_base_url: https://www.plurk.com
///   plain_base_url: http://www.plurk.com
/// ```
///
/// # Secrets
/// `PLURK_API_KEY` and `PLURK_PASSWORD` are read from the environment (a `.env` file is
/// loaded by `main`). They never appear in the YAML.
use anyhow::Result;
use plurackup_core::backup::Credentials;
use plurackup_core::config::{ApiConfig, BackupConfig, FetchConfig, OutputConfig};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const API_KEY_ENV: &str = "PLURK_API_KEY";
pub const PASSWORD_ENV: &str = "PLURK_PASSWORD";

pub struct CliConfig {
    pub backup: BackupConfig,
    pub credentials: Credentials,
    pub api_key: String,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("backup", &self.backup)
            .field("credentials", &self.credentials)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountSection {
    pub username: String,
}

/// Loads the YAML config at `path` and fills in secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    #[derive(Debug, Deserialize)]
    struct RawConfig {
        account: AccountSection,
        #[serde(default)]
        fetch: FetchConfig,
        #[serde(default)]
        output: OutputConfig,
        #[serde(default)]
        api: ApiConfig,
    }

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.account.username.trim().is_empty() {
        return Err(anyhow::anyhow!("account.username must not be empty"));
    }
    if raw.output.formats.is_empty() {
        error!(config_path = ?path_ref, "No output format configured");
        return Err(anyhow::anyhow!(
            "output.formats must name at least one of: xml, html"
        ));
    }
    if raw.fetch.page_size == 0 {
        return Err(anyhow::anyhow!("fetch.page_size must be greater than zero"));
    }

    let api_key = required_env(API_KEY_ENV)?;
    let password = required_env(PASSWORD_ENV)?;

    Ok(CliConfig {
        backup: BackupConfig {
            fetch: raw.fetch,
            output: raw.output,
            api: raw.api,
        },
        credentials: Credentials {
            username: raw.account.username,
            password,
        },
        api_key,
    })
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => {
            error!(variable = name, "Missing required environment variable");
            Err(anyhow::anyhow!(
                "Missing required environment variable {name}"
            ))
        }
    }
}
