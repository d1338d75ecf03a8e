//! Application configuration module
//!
//! Configuration is read from environment variables with the `NOTIFY_RELAY`
//! prefix; nested values use `__` as the separator. Every value has a
//! default, so an empty environment yields a runnable relay with bridging
//! disabled.
//!
//! Two legacy overrides are honoured on top of that:
//!
//! - the first command-line argument, when it parses as a port number,
//!   replaces `server.port`
//! - `POSTGRES_CONNECTION_STRING` supplies `upstream.url` when
//!   `NOTIFY_RELAY__UPSTREAM__URL` is not set
//!
//! # Example
//!
//! ```no_run
//! use notify_relay::config::AppConfig;
//!
//! let mut config = AppConfig::load().expect("Failed to load configuration");
//! config.apply_port_argument(std::env::args().nth(1).as_deref());
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod relay;
mod server;
mod upstream;

pub use error::{ConfigError, ValidationError};
pub use relay::RelayConfig;
pub use server::{LogFormat, ServerConfig};
pub use upstream::UpstreamConfig;

use secrecy::Secret;
use serde::Deserialize;

/// Environment variable consulted for the upstream URL when the prefixed
/// variable is absent.
pub const LEGACY_UPSTREAM_URL_VAR: &str = "POSTGRES_CONNECTION_STRING";

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (bind address, logging, HTTP surface)
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream LISTEN/NOTIFY source; absent URL disables bridging
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Fan-out tuning
    #[serde(default)]
    pub relay: RelayConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, reads `NOTIFY_RELAY__*` variables, then
    /// falls back to [`LEGACY_UPSTREAM_URL_VAR`] for the upstream URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config: AppConfig = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("NOTIFY_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.apply_legacy_upstream_url(std::env::var(LEGACY_UPSTREAM_URL_VAR).ok());
        Ok(config)
    }

    /// Override `server.port` with a positional argument if it is a valid
    /// port. Anything else is ignored.
    pub fn apply_port_argument(&mut self, arg: Option<&str>) {
        if let Some(port) = arg.and_then(|a| a.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    /// Use `url` as the upstream URL unless one is already configured.
    pub fn apply_legacy_upstream_url(&mut self, url: Option<String>) {
        if self.upstream.is_enabled() {
            return;
        }
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.upstream.url = Some(Secret::new(url));
        }
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.upstream.validate()?;
        self.relay.validate()?;
        Ok(())
    }

    /// Whether channels are bridged to an upstream LISTEN/NOTIFY source.
    pub fn bridging_enabled(&self) -> bool {
        self.upstream.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Tests that touch process environment must not interleave.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "NOTIFY_RELAY__SERVER__PORT",
        "NOTIFY_RELAY__SERVER__LOG_FORMAT",
        "NOTIFY_RELAY__SERVER__STATIC_DIR",
        "NOTIFY_RELAY__UPSTREAM__URL",
        "NOTIFY_RELAY__UPSTREAM__CONNECT_TIMEOUT_SECS",
        "NOTIFY_RELAY__RELAY__OUTBOX_CAPACITY",
        LEGACY_UPSTREAM_URL_VAR,
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_with_empty_environment_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = AppConfig::load().expect("Should load with defaults");
        assert_eq!(config.server.port, 2012);
        assert_eq!(config.relay.outbox_capacity, 128);
        assert!(!config.bridging_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("NOTIFY_RELAY__SERVER__PORT", "9000");
        env::set_var("NOTIFY_RELAY__SERVER__LOG_FORMAT", "json");
        env::set_var("NOTIFY_RELAY__UPSTREAM__URL", "postgres://localhost/relay");
        env::set_var("NOTIFY_RELAY__RELAY__OUTBOX_CAPACITY", "16");

        let config = AppConfig::load().expect("Should load config");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.relay.outbox_capacity, 16);
        assert!(config.bridging_enabled());

        clear_env();
    }

    #[test]
    fn test_legacy_connection_string_fallback() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var(LEGACY_UPSTREAM_URL_VAR, "postgresql://legacy/db");

        let config = AppConfig::load().expect("Should load config");
        let url = config.upstream.url().expect("legacy url applied");
        assert_eq!(url.expose_secret(), "postgresql://legacy/db");

        clear_env();
    }

    #[test]
    fn test_prefixed_url_wins_over_legacy() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("NOTIFY_RELAY__UPSTREAM__URL", "postgres://primary/db");
        env::set_var(LEGACY_UPSTREAM_URL_VAR, "postgres://legacy/db");

        let config = AppConfig::load().expect("Should load config");
        assert_eq!(
            config.upstream.url().unwrap().expose_secret(),
            "postgres://primary/db"
        );

        clear_env();
    }

    #[test]
    fn test_empty_legacy_url_leaves_bridging_disabled() {
        let mut config = AppConfig::default();
        config.apply_legacy_upstream_url(Some(String::new()));
        assert!(!config.bridging_enabled());
    }

    #[test]
    fn test_port_argument_override() {
        let mut config = AppConfig::default();
        config.apply_port_argument(Some("4000"));
        assert_eq!(config.server.port, 4000);

        config.apply_port_argument(Some("--verbose"));
        assert_eq!(config.server.port, 4000);

        config.apply_port_argument(None);
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_validate_rejects_bad_upstream_scheme() {
        let mut config = AppConfig::default();
        config.apply_legacy_upstream_url(Some("redis://localhost".to_string()));
        assert_eq!(config.validate(), Err(ValidationError::InvalidUpstreamUrl));
    }
}
