//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API URL is not defined (set {0})")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub log_level: Level,
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
    pub poll_interval: Duration,
    pub progress_linger: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("API_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("API_BASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = std::env::var("PASS_SHARE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.pass-share"));
        let download_dir = std::env::var("PASS_SHARE_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("downloads"));

        let poll_interval = Duration::from_millis(parse_var("POLL_INTERVAL_MS", 4_000)?);
        let progress_linger = Duration::from_millis(parse_var("PROGRESS_LINGER_MS", 900)?);
        let request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 10)?);

        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "POLL_INTERVAL_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            log_level,
            data_dir,
            download_dir,
            poll_interval,
            progress_linger,
            request_timeout,
        })
    }

    /// Defaults for everything except the API location.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        let data_dir = PathBuf::from("./.pass-share");
        Self {
            api_base_url: api_base_url.into(),
            log_level: Level::INFO,
            download_dir: data_dir.join("downloads"),
            data_dir,
            poll_interval: Duration::from_millis(4_000),
            progress_linger: Duration::from_millis(900),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Where the key-value store keeps its JSON file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
