//! Request authenticator driver registry.
//!
//! A driver is a named factory producing a [`RequestAuthenticator`]. The
//! registry always knows the built-in drivers ([`OAUTH10A_DRIVER`] and
//! [`UNAUTHORIZED_DRIVER`]); callers may add their own or replace a built-in
//! by registering under the same name.
//!
//! Selection never fails. An unknown driver name or a failing factory yields
//! the deny-all authenticator, and the failure is logged and kept on the
//! returned [`Selection`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use gatehouse_core::AuthConfig;
use tracing::{Span, error, info, info_span};

use crate::authenticator::RequestAuthenticator;
use crate::credentials::CredentialRepository;
use crate::error::ProviderError;
use crate::oauth10a::{OAUTH10A_DRIVER, provide_oauth10a_request_authenticator};
use crate::unauthorized::{
    UNAUTHORIZED_DRIVER, UnauthorizedRequestAuthenticator,
    provide_unauthorized_request_authenticator,
};

/// Constructor for a request authenticator driver.
///
/// Receives the authentication configuration, the span the authenticator
/// should log in, and the credential repository.
pub type DriverFactory = Arc<
    dyn Fn(
            &AuthConfig,
            &Span,
            Arc<dyn CredentialRepository>,
        ) -> Result<Arc<dyn RequestAuthenticator>, ProviderError>
        + Send
        + Sync,
>;

/// Named request authenticator factories.
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Create a registry holding the built-in drivers.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            drivers: BTreeMap::new(),
        };
        registry.register(OAUTH10A_DRIVER, provide_oauth10a_request_authenticator);
        registry.register(
            UNAUTHORIZED_DRIVER,
            provide_unauthorized_request_authenticator,
        );
        registry
    }

    /// Register a driver factory, replacing any driver with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(
                &AuthConfig,
                &Span,
                Arc<dyn CredentialRepository>,
            ) -> Result<Arc<dyn RequestAuthenticator>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.drivers.insert(name.into(), Arc::new(factory));
        self
    }

    /// Builder form of [`Self::register`].
    #[must_use]
    pub fn with_driver<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(
                &AuthConfig,
                &Span,
                Arc<dyn CredentialRepository>,
            ) -> Result<Arc<dyn RequestAuthenticator>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Add every factory from `drivers`, replacing same-named entries.
    pub fn extend(&mut self, drivers: impl IntoIterator<Item = (String, DriverFactory)>) {
        self.drivers.extend(drivers);
    }

    /// Whether a driver with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Registered driver names, sorted.
    pub fn drivers(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }

    /// Build the authenticator for the configured driver.
    ///
    /// Falls back to [`UnauthorizedRequestAuthenticator`] when the driver is
    /// not registered or its factory fails. The fallback is always the
    /// built-in deny-all authenticator, even if the `unauthorized` name has
    /// been overridden.
    pub fn select(
        &self,
        config: &AuthConfig,
        span: &Span,
        credentials: Arc<dyn CredentialRepository>,
    ) -> Selection {
        let driver = config.driver();

        let result = match self.drivers.get(driver) {
            Some(factory) => factory(config, span, credentials),
            None => Err(ProviderError::UnsupportedDriver(driver.to_owned())),
        };

        match result {
            Ok(authenticator) => {
                span.in_scope(|| {
                    info!(driver, "Request authentication configured");
                });
                Selection {
                    driver: driver.to_owned(),
                    authenticator,
                    fallback: None,
                }
            }
            Err(err) => {
                span.in_scope(|| {
                    error!(
                        driver,
                        error = %err,
                        transient = err.is_transient(),
                        "Unable to use request authenticator driver, using '{}' driver; \
                         every request will be answered with 401 Unauthorized",
                        UNAUTHORIZED_DRIVER
                    );
                });
                Selection {
                    driver: driver.to_owned(),
                    authenticator: Arc::new(UnauthorizedRequestAuthenticator::new(span.clone())),
                    fallback: Some(err),
                }
            }
        }
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The outcome of [`DriverRegistry::select`].
#[derive(Debug, Clone)]
pub struct Selection {
    driver: String,
    authenticator: Arc<dyn RequestAuthenticator>,
    fallback: Option<ProviderError>,
}

impl Selection {
    /// The driver name that was requested.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// The authenticator to use.
    #[must_use]
    pub fn authenticator(&self) -> &Arc<dyn RequestAuthenticator> {
        &self.authenticator
    }

    /// Consume the selection, keeping only the authenticator.
    #[must_use]
    pub fn into_authenticator(self) -> Arc<dyn RequestAuthenticator> {
        self.authenticator
    }

    /// Why the requested driver was replaced by the deny-all authenticator.
    #[must_use]
    pub fn fallback(&self) -> Option<&ProviderError> {
        self.fallback.as_ref()
    }

    /// Whether the deny-all fallback is in use.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Select a request authenticator for `config`.
///
/// `extra_drivers` are registered on top of the built-in drivers. A span named
/// `request_auth` carrying the driver name is created for the authenticator.
pub fn provide_request_authenticator(
    config: &AuthConfig,
    credentials: Arc<dyn CredentialRepository>,
    extra_drivers: impl IntoIterator<Item = (String, DriverFactory)>,
) -> Arc<dyn RequestAuthenticator> {
    let mut registry = DriverRegistry::new();
    registry.extend(extra_drivers);

    let span = info_span!("request_auth", driver = config.driver());
    registry
        .select(config, &span, credentials)
        .into_authenticator()
}
