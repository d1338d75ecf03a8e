//! Upstream notification source configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Upstream (Postgres LISTEN/NOTIFY) configuration.
///
/// Bridging is enabled only when `url` is present and non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// PostgreSQL connection URL
    pub url: Option<Secret<String>>,

    /// Per-channel connect + LISTEN timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl UpstreamConfig {
    /// The connection URL, if bridging is configured.
    pub fn url(&self) -> Option<&Secret<String>> {
        self.url
            .as_ref()
            .filter(|url| !url.expose_secret().trim().is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.url().is_some()
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate upstream configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = self.url() {
            let url = url.expose_secret();
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(ValidationError::InvalidUpstreamUrl);
            }
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidUpstreamTimeout);
        }
        Ok(())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}
