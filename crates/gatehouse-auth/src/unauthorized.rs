//! Deny-all request authenticator.

use std::sync::Arc;

use gatehouse_core::AuthConfig;
use tracing::{Span, warn};

use crate::authenticator::{AuthDecision, RequestAuthenticator};
use crate::credentials::CredentialRepository;
use crate::error::{AuthError, ProviderError};
use crate::request::RequestView;

/// Driver name of the deny-all authenticator.
pub const UNAUTHORIZED_DRIVER: &str = "unauthorized";

/// Rejects every request.
///
/// This is the default driver and the fallback whenever the configured
/// driver cannot be built.
#[derive(Debug, Clone)]
pub struct UnauthorizedRequestAuthenticator {
    span: Span,
}

impl UnauthorizedRequestAuthenticator {
    /// Create a deny-all authenticator logging inside `span`.
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self { span }
    }
}

impl Default for UnauthorizedRequestAuthenticator {
    fn default() -> Self {
        Self::new(Span::none())
    }
}

impl RequestAuthenticator for UnauthorizedRequestAuthenticator {
    fn driver(&self) -> &str {
        UNAUTHORIZED_DRIVER
    }

    fn authenticate(&self, request: &RequestView) -> AuthDecision {
        let _entered = self.span.enter();
        warn!(
            method = %request.method(),
            path = request.path(),
            "Rejecting request, no request authenticator is configured"
        );
        Err(AuthError::Unauthenticated)
    }
}

/// Driver factory for [`UNAUTHORIZED_DRIVER`].
///
/// # Errors
///
/// Never fails.
pub fn provide_unauthorized_request_authenticator(
    _config: &AuthConfig,
    span: &Span,
    _credentials: Arc<dyn CredentialRepository>,
) -> Result<Arc<dyn RequestAuthenticator>, ProviderError> {
    Ok(Arc::new(UnauthorizedRequestAuthenticator::new(span.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credential, StaticCredentialRepository};

    #[test]
    fn test_should_reject_every_request() {
        let authenticator = UnauthorizedRequestAuthenticator::default();
        let request: RequestView = http::Request::builder()
            .uri("https://example.com/anything")
            .header("Authorization", "OAuth oauth_consumer_key=\"k\"")
            .body("")
            .unwrap()
            .into();

        let err = authenticator.authenticate(&request).unwrap_err();
        assert_eq!(err, AuthError::Unauthenticated);
        assert_eq!(err.to_string(), "Unauthenticated.");
    }

    #[test]
    fn test_should_provide_unauthorized_driver_regardless_of_credentials() {
        let authenticator = provide_unauthorized_request_authenticator(
            &AuthConfig::default(),
            &Span::none(),
            Arc::new(StaticCredentialRepository::new([Credential::new("k", "s")])),
        )
        .unwrap();
        assert_eq!(authenticator.driver(), UNAUTHORIZED_DRIVER);
    }
}
