//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Longest freshness window accepted for either TTL.
const MAX_TTL_SECS: u64 = 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - either TTL is 0 or exceeds 24 hours
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `bucket`, `user_agent` or `legistar_client` is empty
    /// - a base URL does not parse
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, secs) in [("snapshot_ttl_secs", self.snapshot_ttl_secs), ("detail_ttl_secs", self.detail_ttl_secs)] {
            if secs == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
            if secs > MAX_TTL_SECS {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not exceed 24 hours".into() });
            }
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        for (field, value) in
            [("bucket", &self.bucket), ("user_agent", &self.user_agent), ("legistar_client", &self.legistar_client)]
        {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
        }

        for (field, value) in [
            ("storage_base_url", &self.storage_base_url),
            ("legistar_base_url", &self.legistar_base_url),
            ("lookup_url", &self.lookup_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::Invalid { field: field.into(), reason: e.to_string() })?;
        }

        if self.dev_file_path.is_some() && !self.dev_mode {
            tracing::warn!("dev_file_path is set outside dev_mode; snapshots will be read from local disk");
        }

        Ok(())
    }
}
