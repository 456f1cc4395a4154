//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base URL override, the token storage backend, request
//! tuning and the last used username.
//!
//! Configuration is stored at `~/.config/folio/config.json`. When loaded
//! from disk, the `FOLIO_API_URL` environment variable takes precedence over
//! the file. Configs built in code never consult the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "folio";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable holding the production API base URL
pub const API_URL_ENV: &str = "FOLIO_API_URL";

/// Development backend, served behind the `/api/v1` proxy path.
pub const DEV_API_BASE_URL: &str = "http://localhost:8000/api/v1";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Where the auth token is persisted between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub last_username: Option<String>,
    #[serde(default)]
    pub token_backend: TokenBackend,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Base URL from the environment; wins over `api_url`, never saved.
    #[serde(skip)]
    pub api_url_override: Option<String>,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            last_username: None,
            token_backend: TokenBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            api_url_override: None,
        }
    }
}

impl Config {
    /// Config pointing at an explicit base URL, with default tuning.
    pub fn with_base_url(url: impl Into<String>) -> Self {
        Self {
            api_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Load the config file (or defaults) and apply `FOLIO_API_URL`.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        Ok(config.with_api_url_override(std::env::var(API_URL_ENV).ok()))
    }

    /// Set the base URL override; blank values are ignored.
    pub fn with_api_url_override(mut self, url: Option<String>) -> Self {
        self.api_url_override = url.filter(|url| !url.trim().is_empty());
        self
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Resolve the API base URL: override, then `api_url`, then the
    /// development proxy default. Trailing slashes are stripped.
    pub fn api_base_url(&self) -> String {
        let url = self
            .api_url_override
            .as_deref()
            .or(self.api_url.as_deref())
            .unwrap_or(DEV_API_BASE_URL);
        url.trim().trim_end_matches('/').to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.token_backend, TokenBackend::File);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_url": "https://example.com/api/v1/", "token_backend": "keyring"}"#)
                .expect("Failed to parse config test JSON");
        assert_eq!(config.token_backend, TokenBackend::Keyring);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = Config::with_base_url("https://example.com/api/v1/");
        assert_eq!(config.api_base_url(), "https://example.com/api/v1");
        assert_eq!(Config::default().api_base_url(), DEV_API_BASE_URL);
    }

    #[test]
    fn test_override_wins_over_file_url() {
        let config = Config::with_base_url("https://file.example.com/api/v1")
            .with_api_url_override(Some("https://env.example.com/api/v1/".into()));
        assert_eq!(config.api_base_url(), "https://env.example.com/api/v1");

        let blank = Config::with_base_url("https://file.example.com/api/v1")
            .with_api_url_override(Some("  ".into()));
        assert_eq!(blank.api_base_url(), "https://file.example.com/api/v1");
    }

    #[test]
    fn test_override_is_not_saved() {
        let config = Config::default().with_api_url_override(Some("https://env.example.com".into()));
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("api_url_override").is_none());
        assert!(json["api_url"].is_null());
    }
}
