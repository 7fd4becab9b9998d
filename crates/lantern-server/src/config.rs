//! Server configuration types.
//!
//! A [`ServerConfig`] is built with [`ServerConfig::builder()`], loaded from
//! TOML with [`ServerConfig::from_toml_str`], and optionally overlaid with
//! environment variables by [`ServerConfig::with_env_overrides`].
//!
//! # Example
//!
//! ```rust
//! use lantern_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .bind_addr("127.0.0.1:8080")
//!     .shutdown_timeout(Duration::from_millis(150))
//!     .build();
//!
//! assert_eq!(config.bind_addr(), "127.0.0.1:8080");
//! assert_eq!(config.restart_timeout(), Duration::from_millis(100));
//! ```

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use lantern_telemetry::LogConfig;
use serde::Deserialize;

use crate::error::{ServerError, ServerResult};

/// Default bind address: loopback with an OS-chosen port.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:0";

/// Default drain timeout used by [`Server::shutdown`](crate::Server::shutdown).
///
/// Mobile hosts get roughly 100-200 ms on the UI thread.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 100;

/// Default drain timeout used when `start` replaces a running instance.
pub const DEFAULT_RESTART_TIMEOUT_MS: u64 = 100;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    bind_addr: String,
    shutdown_timeout: Duration,
    restart_timeout: Duration,
    keep_alive: bool,
    logging: LogConfig,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the address used by [`Server::start_configured`](crate::Server::start_configured).
    #[must_use]
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Returns the drain timeout used by [`Server::shutdown`](crate::Server::shutdown).
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the drain timeout applied when `start` replaces a running
    /// instance.
    #[must_use]
    pub fn restart_timeout(&self) -> Duration {
        self.restart_timeout
    }

    /// Returns whether HTTP/1.1 keep-alive is enabled.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Returns the logging section.
    ///
    /// The server never installs a subscriber itself; hosts pass this to
    /// [`lantern_telemetry::init_logging`].
    #[must_use]
    pub fn logging(&self) -> &LogConfig {
        &self.logging
    }

    /// Parses a TOML document.
    ///
    /// ```toml
    /// bind_addr = "127.0.0.1:8080"
    /// shutdown_timeout_ms = 150
    /// restart_timeout_ms = 100
    /// keep_alive = true
    ///
    /// [logging]
    /// level = "lantern_server=debug,info"
    /// ```
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> ServerResult<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(file.into_builder().build())
    }

    /// Builds the default configuration overlaid with `<PREFIX>_*`
    /// environment variables.
    pub fn from_env(prefix: &str) -> ServerResult<Self> {
        Self::default().with_env_overrides(prefix)
    }

    /// Overlays `<PREFIX>_*` environment variables onto this configuration.
    ///
    /// Recognized keys: `BIND_ADDR`, `SHUTDOWN_TIMEOUT_MS`,
    /// `RESTART_TIMEOUT_MS`, `KEEP_ALIVE`, `LOG_LEVEL`.
    pub fn with_env_overrides(self, prefix: &str) -> ServerResult<Self> {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        self.apply_env_vars(prefix, vars)
    }

    fn apply_env_vars(
        mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> ServerResult<Self> {
        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(self)
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> ServerResult<()> {
        let Some(name) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix('_')) else {
            return Ok(());
        };

        match name {
            "BIND_ADDR" => self.bind_addr = value.to_string(),
            "SHUTDOWN_TIMEOUT_MS" => self.shutdown_timeout = parse_millis(key, value)?,
            "RESTART_TIMEOUT_MS" => self.restart_timeout = parse_millis(key, value)?,
            "KEEP_ALIVE" => {
                self.keep_alive = parse_bool(value)
                    .ok_or_else(|| env_error(key, "expected boolean"))?;
            }
            "LOG_LEVEL" => self.logging.level = value.to_string(),
            _ => tracing::debug!(key, "ignoring unknown configuration variable"),
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    bind_addr: String,
    shutdown_timeout: Duration,
    restart_timeout: Duration,
    keep_alive: bool,
    logging: LogConfig,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            restart_timeout: Duration::from_millis(DEFAULT_RESTART_TIMEOUT_MS),
            keep_alive: true,
            logging: LogConfig::default(),
        }
    }

    /// Sets the default bind address.
    #[must_use]
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Sets the default drain timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the drain timeout used when restarting.
    #[must_use]
    pub fn restart_timeout(mut self, timeout: Duration) -> Self {
        self.restart_timeout = timeout;
        self
    }

    /// Enables or disables HTTP/1.1 keep-alive.
    #[must_use]
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr,
            shutdown_timeout: self.shutdown_timeout,
            restart_timeout: self.restart_timeout,
            keep_alive: self.keep_alive,
            logging: self.logging,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk shape of the configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind_addr: Option<String>,
    shutdown_timeout_ms: Option<u64>,
    restart_timeout_ms: Option<u64>,
    keep_alive: Option<bool>,
    logging: Option<LogConfig>,
}

impl FileConfig {
    fn into_builder(self) -> ServerConfigBuilder {
        let mut builder = ServerConfigBuilder::new();
        if let Some(addr) = self.bind_addr {
            builder = builder.bind_addr(addr);
        }
        if let Some(ms) = self.shutdown_timeout_ms {
            builder = builder.shutdown_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.restart_timeout_ms {
            builder = builder.restart_timeout(Duration::from_millis(ms));
        }
        if let Some(keep_alive) = self.keep_alive {
            builder = builder.keep_alive(keep_alive);
        }
        if let Some(logging) = self.logging {
            builder = builder.logging(logging);
        }
        builder
    }
}

fn parse_millis(key: &str, value: &str) -> ServerResult<Duration> {
    value
        .trim()
        .parse()
        .map(Duration::from_millis)
        .map_err(|_| env_error(key, "expected milliseconds"))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_error(key: &str, reason: &str) -> ServerError {
    ServerError::Config(format!("{key}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(100));
        assert_eq!(config.restart_timeout(), Duration::from_millis(100));
        assert!(config.keep_alive());
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder()
            .bind_addr("127.0.0.1:9999")
            .shutdown_timeout(Duration::from_millis(250))
            .restart_timeout(Duration::from_millis(50))
            .keep_alive(false)
            .build();

        assert_eq!(config.bind_addr(), "127.0.0.1:9999");
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(250));
        assert_eq!(config.restart_timeout(), Duration::from_millis(50));
        assert!(!config.keep_alive());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ServerConfig::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:8080"
            shutdown_timeout_ms = 150

            [logging]
            level = "debug"
            json_format = false
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(150));
        assert_eq!(config.restart_timeout(), Duration::from_millis(100));
        assert_eq!(config.logging().level, "debug");
        assert!(!config.logging().json_format);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = ServerConfig::from_toml_str("http2 = true").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::default()
            .apply_env_vars(
                "LANTERN",
                vars(&[
                    ("LANTERN_BIND_ADDR", "127.0.0.1:7000"),
                    ("LANTERN_SHUTDOWN_TIMEOUT_MS", "200"),
                    ("LANTERN_RESTART_TIMEOUT_MS", "20"),
                    ("LANTERN_KEEP_ALIVE", "off"),
                    ("LANTERN_LOG_LEVEL", "warn"),
                    ("LANTERN_SOMETHING_ELSE", "ignored"),
                ]),
            )
            .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:7000");
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(200));
        assert_eq!(config.restart_timeout(), Duration::from_millis(20));
        assert!(!config.keep_alive());
        assert_eq!(config.logging().level, "warn");
    }

    #[test]
    fn test_env_invalid_values() {
        let result = ServerConfig::default()
            .apply_env_vars("LANTERN", vars(&[("LANTERN_SHUTDOWN_TIMEOUT_MS", "soon")]));
        assert!(matches!(result, Err(ServerError::Config(_))));

        let result = ServerConfig::default()
            .apply_env_vars("LANTERN", vars(&[("LANTERN_KEEP_ALIVE", "maybe")]));
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
