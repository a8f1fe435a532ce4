//! Configuration management for Gatehouse.
//!
//! All configuration is driven by environment variables. [`AuthConfig`] selects
//! the request authenticator driver and carries any driver-specific options;
//! [`GatewayConfig`] configures the HTTP boundary.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{GatehouseError, GatehouseResult};

/// Configuration key (and environment variable) that selects the request
/// authenticator driver.
pub const REQUEST_AUTH_DRIVER: &str = "REQUEST_AUTH_DRIVER";

/// Driver used when [`REQUEST_AUTH_DRIVER`] is unset: reject everything.
pub const DEFAULT_DRIVER: &str = "unauthorized";

/// Prefix shared by all request authentication options.
const REQUEST_AUTH_PREFIX: &str = "REQUEST_AUTH_";

/// Request authentication configuration.
///
/// The driver name is the only option the built-in drivers read. Any other
/// `REQUEST_AUTH_*` variable is kept in [`AuthConfig::options`] so custom
/// driver factories can read their own settings.
///
/// # Examples
///
/// ```
/// use gatehouse_core::AuthConfig;
///
/// let config = AuthConfig::from_pairs([
///     ("REQUEST_AUTH_DRIVER", "oauth10a"),
///     ("REQUEST_AUTH_REALM", "connectors"),
///     ("HOME", "/root"),
/// ]);
/// assert_eq!(config.driver(), "oauth10a");
/// assert_eq!(config.option("REQUEST_AUTH_REALM"), Some("connectors"));
/// assert_eq!(config.option("HOME"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Name of the request authenticator driver to use.
    pub request_auth_driver: String,
    /// Additional driver options keyed by their full variable name.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            request_auth_driver: DEFAULT_DRIVER.to_owned(),
            options: BTreeMap::new(),
        }
    }
}

impl AuthConfig {
    /// Create a configuration selecting the given driver.
    #[must_use]
    pub fn with_driver(driver: impl Into<String>) -> Self {
        Self {
            request_auth_driver: driver.into(),
            options: BTreeMap::new(),
        }
    }

    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Load configuration from environment variables, selecting `default`
    /// when [`REQUEST_AUTH_DRIVER`] is unset or blank.
    #[must_use]
    pub fn from_env_with_default(default: &str) -> Self {
        Self::from_pairs_with_default(std::env::vars(), default)
    }

    /// Build configuration from arbitrary key/value pairs.
    ///
    /// Keys that do not start with `REQUEST_AUTH_` are ignored. An empty
    /// driver value leaves [`DEFAULT_DRIVER`] in place.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_pairs_with_default(pairs, DEFAULT_DRIVER)
    }

    /// Build configuration from key/value pairs, selecting `default` when no
    /// non-blank driver is present.
    ///
    /// ```
    /// use gatehouse_core::AuthConfig;
    ///
    /// let config = AuthConfig::from_pairs_with_default([("HOME", "/root")], "oauth10a");
    /// assert_eq!(config.driver(), "oauth10a");
    /// ```
    #[must_use]
    pub fn from_pairs_with_default<I, K, V>(pairs: I, default: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::with_driver(default);

        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            if key == REQUEST_AUTH_DRIVER {
                let driver = value.trim();
                if !driver.is_empty() {
                    driver.clone_into(&mut config.request_auth_driver);
                }
            } else if key.starts_with(REQUEST_AUTH_PREFIX) {
                config.options.insert(key, value);
            }
        }

        config
    }

    /// Add a driver option, returning the updated configuration.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// The configured driver name.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.request_auth_driver
    }

    /// Look up a driver option by its full key.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Configuration for the Gatehouse HTTP gateway.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the gateway.
    pub gateway_listen: String,
    /// Log level.
    pub log_level: String,
    /// Optional JSON file holding client credentials.
    pub credentials_file: Option<PathBuf>,
    /// Scheme assumed for requests that arrive without an absolute URI.
    pub forwarded_scheme: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            credentials_file: None,
            forwarded_scheme: "http".to_owned(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("CREDENTIALS_FILE") {
            if !v.trim().is_empty() {
                config.credentials_file = Some(PathBuf::from(v));
            }
        }
        if let Ok(v) = std::env::var("FORWARDED_SCHEME") {
            config.forwarded_scheme = v.to_ascii_lowercase();
        }

        config
    }

    /// Parse the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`GatehouseError::Config`] if `gateway_listen` is not a valid
    /// socket address.
    pub fn listen_addr(&self) -> GatehouseResult<SocketAddr> {
        self.gateway_listen.parse().map_err(|e| {
            GatehouseError::Config(format!(
                "invalid GATEWAY_LISTEN address {}: {e}",
                self.gateway_listen
            ))
        })
    }
}
