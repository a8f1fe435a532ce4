//! The request authenticator contract.

use std::fmt;

use crate::error::AuthError;
use crate::request::RequestView;

/// Outcome of authenticating one request.
///
/// `Ok(())` lets the request through; `Err` carries the reason it was
/// rejected.
pub type AuthDecision = Result<(), AuthError>;

/// A strategy that decides whether a request is authenticated.
///
/// Implementations hold only immutable state and are shared across request
/// handlers behind an `Arc`.
pub trait RequestAuthenticator: Send + Sync + fmt::Debug {
    /// Name of the driver that built this authenticator.
    fn driver(&self) -> &str;

    /// Authenticate a single request.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] describing why the request is rejected.
    fn authenticate(&self, request: &RequestView) -> AuthDecision;
}
