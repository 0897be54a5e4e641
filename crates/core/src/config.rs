//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` in the user
//! config directory, then `HOLDINGS_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Directory under the platform config/data dirs used by the client.
pub const APP_DIR: &str = "holdings";
/// Backend location used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

const DEFAULT_CONFIG: &str = r#"# Holdings client configuration.
#
# Every key can also be set through the environment, e.g.
# HOLDINGS_API_BASE_URL=https://example.com/hungStock/api

# Base URL of the holdings REST API.
api_base_url = "http://localhost:8080/api"

# Seconds before a request is abandoned.
request_timeout_secs = 15

# Where the signed-in user's display record is cached.
# session_file = "/home/me/.local/share/holdings/session.json"
"#;

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the REST API, including the `/api` prefix.
    pub api_base_url: String,
    /// File caching the signed-in user's display record.
    pub session_file: PathBuf,
    /// Seconds before a request is abandoned.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_file: default_session_file(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (optional) and environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = ::config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default(
                "session_file",
                defaults.session_file.to_string_lossy().to_string(),
            )?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .add_source(::config::File::from(path.to_path_buf()).required(false))
            .add_source(::config::Environment::with_prefix("HOLDINGS"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .context("failed to parse configuration")
    }
}

/// Location of `config.toml`.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Default location of the cached session record.
pub fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("session.json")
}

/// Write a commented default `config.toml` if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    ensure_config_at(config_path())
}

fn ensure_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}
