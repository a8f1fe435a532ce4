//! OAuth 1.0a request authenticator.
//!
//! Verification runs as a short pipeline, any step of which rejects the
//! request with its own reason:
//!
//! 1. read and parse the `Authorization` header
//! 2. resolve the credential for `oauth_consumer_key`
//! 3. recompute the signature with the signature engine
//! 4. compare it in constant time with the presented `oauth_signature`
//!
//! Timestamps and nonces are signed but not checked for freshness or reuse.

use std::fmt;
use std::sync::Arc;

use gatehouse_core::AuthConfig;
use subtle::ConstantTimeEq;
use tracing::{Span, debug, warn};

use crate::authenticator::{AuthDecision, RequestAuthenticator};
use crate::credentials::{Credential, CredentialRepository};
use crate::error::{AuthError, ProviderError};
use crate::header::{OAuthParameters, parse_authorization_header};
use crate::request::RequestView;
use crate::signature::{SignatureMethods, compute_signature};

/// Driver name of the OAuth 1.0a authenticator.
pub const OAUTH10A_DRIVER: &str = "oauth10a";

/// Authenticates requests signed with OAuth 1.0a (RFC 5849).
#[derive(Clone)]
pub struct OAuth10aRequestAuthenticator {
    credentials: Arc<dyn CredentialRepository>,
    methods: SignatureMethods,
    span: Span,
}

impl OAuth10aRequestAuthenticator {
    /// Create an authenticator accepting HMAC-SHA1 signatures.
    pub fn new(credentials: Arc<dyn CredentialRepository>) -> Self {
        Self {
            credentials,
            methods: SignatureMethods::new(),
            span: Span::none(),
        }
    }

    /// Record verification events inside the given span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Replace the accepted signature methods.
    #[must_use]
    pub fn with_signature_methods(mut self, methods: SignatureMethods) -> Self {
        self.methods = methods;
        self
    }

    fn parse_header(request: &RequestView) -> Result<OAuthParameters, AuthError> {
        let mut values = request.headers().get_all(http::header::AUTHORIZATION).iter();
        let value = values.next().ok_or(AuthError::MissingSignature)?;
        if values.next().is_some() {
            return Err(AuthError::MalformedSignature);
        }
        let value = value.to_str().map_err(|_| AuthError::MalformedSignature)?;
        parse_authorization_header(value)
    }

    fn resolve_credential(&self, consumer_key: &str) -> Result<Credential, AuthError> {
        match self.credentials.get(consumer_key) {
            Ok(Some(credential)) => Ok(credential),
            Ok(None) => {
                debug!(consumer_key, "No credential for consumer key");
                Err(AuthError::UnknownClient)
            }
            Err(err) => {
                warn!(consumer_key, error = %err, "Credential lookup failed");
                Err(AuthError::UnknownClient)
            }
        }
    }
}

impl RequestAuthenticator for OAuth10aRequestAuthenticator {
    fn driver(&self) -> &str {
        OAUTH10A_DRIVER
    }

    fn authenticate(&self, request: &RequestView) -> AuthDecision {
        let _entered = self.span.enter();

        let oauth = Self::parse_header(request)?;
        debug!(
            consumer_key = %oauth.consumer_key,
            signature_method = %oauth.signature_method,
            timestamp = %oauth.timestamp,
            nonce = %oauth.nonce,
            "Parsed OAuth 1.0a authorization header"
        );

        let credential = self.resolve_credential(&oauth.consumer_key)?;

        let generated =
            compute_signature(request, &oauth, &credential, &self.methods).map_err(|err| {
                debug!(error = %err, "Unable to compute request signature");
                AuthError::InvalidSignature
            })?;
        debug!(generated = %generated, received = %oauth.signature, "Comparing signatures");

        if bool::from(generated.as_bytes().ct_eq(oauth.signature.as_bytes())) {
            Ok(())
        } else {
            Err(AuthError::InvalidSignature)
        }
    }
}

impl fmt::Debug for OAuth10aRequestAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth10aRequestAuthenticator")
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Driver factory for [`OAUTH10A_DRIVER`].
///
/// # Errors
///
/// Never fails; the signature matches the other driver factories.
pub fn provide_oauth10a_request_authenticator(
    _config: &AuthConfig,
    span: &Span,
    credentials: Arc<dyn CredentialRepository>,
) -> Result<Arc<dyn RequestAuthenticator>, ProviderError> {
    Ok(Arc::new(
        OAuth10aRequestAuthenticator::new(credentials).with_span(span.clone()),
    ))
}
