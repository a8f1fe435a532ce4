//! Error types for request authentication.
//!
//! [`AuthError`] is what a request sees: every variant renders as the
//! client-facing `Unauthenticated, ...` message and maps to HTTP 401. The
//! remaining types describe failures of the collaborators (credential store,
//! signature methods, driver factories) before they are folded into an
//! [`AuthError`] or a driver fallback.

use std::path::PathBuf;

/// Reasons a request is not authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("Unauthenticated, missing oauth 1.0a signature.")]
    MissingSignature,

    /// The `Authorization` header could not be parsed into OAuth 1.0a parameters.
    #[error("Unauthenticated, malformed oauth 1.0a signature.")]
    MalformedSignature,

    /// No credential could be resolved for the presented consumer key.
    #[error("Unauthenticated, invalid client/consumer key.")]
    UnknownClient,

    /// The recomputed signature does not match the presented one.
    #[error("Unauthenticated, the provided signature is not valid.")]
    InvalidSignature,

    /// The request was rejected unconditionally by the deny-all driver.
    #[error("Unauthenticated.")]
    Unauthenticated,
}

impl AuthError {
    /// The detail fragment embedded in the message, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_auth::AuthError;
    ///
    /// assert_eq!(AuthError::UnknownClient.detail(), Some("invalid client/consumer key"));
    /// assert_eq!(AuthError::Unauthenticated.detail(), None);
    /// ```
    #[must_use]
    pub fn detail(&self) -> Option<&'static str> {
        match self {
            Self::MissingSignature => Some("missing oauth 1.0a signature"),
            Self::MalformedSignature => Some("malformed oauth 1.0a signature"),
            Self::UnknownClient => Some("invalid client/consumer key"),
            Self::InvalidSignature => Some("the provided signature is not valid"),
            Self::Unauthenticated => None,
        }
    }

    /// HTTP status the boundary layer should answer with.
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        http::StatusCode::UNAUTHORIZED
    }
}

/// Failures raised by a credential repository.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The backing store could not be reached or answered with an error.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    /// A credential file could not be read.
    #[error("failed to read credential file {}: {source}", path.display())]
    Io {
        /// Path of the file that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Credential data could not be decoded.
    #[error("invalid credential data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures raised while computing a signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// No signature method is registered under the presented name.
    #[error("unsupported signature method: {0}")]
    UnsupportedMethod(String),

    /// The signing key was rejected by the underlying primitive.
    #[error("invalid signing key")]
    InvalidKey,
}

/// Failures raised while constructing an authenticator from a driver.
///
/// The driver selector never propagates these; they are recorded on the
/// selection and the deny-all authenticator is used instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The configured driver name is not registered.
    #[error("Unsupported request authenticator driver {0}.")]
    UnsupportedDriver(String),

    /// The driver factory rejected its configuration or dependencies.
    #[error("unable to construct request authenticator driver {driver}: {reason}")]
    Construction {
        /// Driver that failed.
        driver: String,
        /// Human-readable cause.
        reason: String,
    },

    /// The driver factory hit a failure that may clear up on a later attempt.
    #[error("request authenticator driver {driver} is temporarily unavailable: {reason}")]
    Transient {
        /// Driver that failed.
        driver: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl ProviderError {
    /// Build a [`ProviderError::Construction`] error.
    pub fn construction(driver: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            driver: driver.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`ProviderError::Transient`] error.
    pub fn transient(driver: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transient {
            driver: driver.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the selection later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
