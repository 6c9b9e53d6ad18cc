//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CIVIC_*)
//! 2. TOML config file (if CIVIC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CIVIC_*)
/// 2. TOML config file (if CIVIC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Object-storage bucket holding the JSON snapshot files.
    ///
    /// Set via CIVIC_BUCKET environment variable.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Base URL of the object-storage HTTP endpoint.
    #[serde(default = "default_storage_base_url")]
    pub storage_base_url: String,

    /// Bearer token for private buckets. Anonymous reads when unset.
    #[serde(default)]
    pub storage_token: Option<String>,

    /// Read snapshots from this local directory instead of the bucket.
    ///
    /// Set via CIVIC_DEV_FILE_PATH environment variable.
    #[serde(default)]
    pub dev_file_path: Option<PathBuf>,

    /// Base URL of the legislative-records web API.
    #[serde(default = "default_legistar_base_url")]
    pub legistar_base_url: String,

    /// Legistar client (jurisdiction) name.
    #[serde(default = "default_legistar_client")]
    pub legistar_client: String,

    /// Legistar access token.
    ///
    /// Set via CIVIC_LEGISTAR_TOKEN environment variable.
    #[serde(default)]
    pub legistar_token: Option<String>,

    /// Gateway URL that redirects a matter id to its public detail page.
    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,

    /// Freshness window for snapshot files, in seconds.
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,

    /// Freshness window for assembled bill details, in seconds.
    #[serde(default = "default_detail_ttl_secs")]
    pub detail_ttl_secs: u64,

    /// Per-request deadline in milliseconds.
    ///
    /// Set via CIVIC_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Share one in-flight fetch among concurrent misses for the same key.
    #[serde(default)]
    pub coalesce_fetches: bool,

    /// Socket address for the HTTP listener.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Development mode disables Cache-Control headers.
    #[serde(default)]
    pub dev_mode: bool,

    /// Log one line per HTTP request.
    #[serde(default)]
    pub log_requests: bool,
}

fn default_bucket() -> String {
    "intronyc".into()
}

fn default_storage_base_url() -> String {
    "https://storage.googleapis.com".into()
}

fn default_legistar_base_url() -> String {
    "https://webapi.legistar.com/v1".into()
}

fn default_legistar_client() -> String {
    "nyc".into()
}

fn default_lookup_url() -> String {
    "https://legistar.council.nyc.gov/gateway.aspx?m=l&id=".into()
}

fn default_snapshot_ttl_secs() -> u64 {
    5 * 60
}

fn default_detail_ttl_secs() -> u64 {
    60 * 60
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_user_agent() -> String {
    "civic-mirror/0.1".into()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            storage_base_url: default_storage_base_url(),
            storage_token: None,
            dev_file_path: None,
            legistar_base_url: default_legistar_base_url(),
            legistar_client: default_legistar_client(),
            legistar_token: None,
            lookup_url: default_lookup_url(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
            detail_ttl_secs: default_detail_ttl_secs(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            coalesce_fetches: false,
            listen_addr: default_listen_addr(),
            dev_mode: false,
            log_requests: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CIVIC_`
    /// 2. TOML file from `CIVIC_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CIVIC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CIVIC_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        if let Ok(port) = std::env::var("PORT") {
            config.listen_addr = config.with_port(&port)?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Replace the port of `listen_addr`, keeping its host.
    fn with_port(&self, port: &str) -> Result<String, ConfigError> {
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::Invalid { field: "PORT".into(), reason: format!("not a port number: {port}") })?;
        let host = self.listen_addr.rsplit_once(':').map(|(host, _)| host).unwrap_or("0.0.0.0");
        Ok(format!("{host}:{port}"))
    }

    /// Check if the Legistar token is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the token is not set.
    pub fn require_legistar_token(&self) -> Result<&str, ConfigError> {
        self.legistar_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "legistar_token".into(),
                hint: "Set CIVIC_LEGISTAR_TOKEN environment variable".into(),
            })
    }
}
