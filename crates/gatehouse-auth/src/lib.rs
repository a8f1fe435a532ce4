//! OAuth 1.0a request authentication for Gatehouse.
//!
//! This crate verifies OAuth 1.0a (RFC 5849) signatures on incoming HTTP
//! requests and selects, by configuration, which authentication strategy
//! handles them.
//!
//! # Overview
//!
//! A client signs each request with HMAC-SHA1 using a shared secret and sends
//! the signature in the `Authorization` header. The verification side parses
//! that header, looks up the client's secrets in a [`CredentialRepository`],
//! recomputes the signature over the request, and compares the two.
//!
//! Authentication strategies are pluggable drivers. The built-in `oauth10a`
//! driver verifies signatures; the built-in `unauthorized` driver rejects
//! everything and is what an unknown or broken driver degrades to.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use gatehouse_auth::credentials::{Credential, StaticCredentialRepository};
//! use gatehouse_auth::{AuthError, RequestView, provide_request_authenticator};
//! use gatehouse_core::AuthConfig;
//!
//! let credentials = Arc::new(StaticCredentialRepository::new([Credential::new("key", "secret")]));
//! let authenticator =
//!     provide_request_authenticator(&AuthConfig::with_driver("oauth10a"), credentials, []);
//!
//! let request: RequestView = http::Request::builder()
//!     .uri("https://api.example.com/items")
//!     .body("")
//!     .unwrap()
//!     .into();
//! assert_eq!(authenticator.authenticate(&request), Err(AuthError::MissingSignature));
//! ```
//!
//! # Modules
//!
//! - [`authenticator`] - The authenticator trait and decision type
//! - [`canonical`] - Signature base string construction
//! - [`credentials`] - Credential repository trait and in-memory implementation
//! - [`error`] - Authentication error types
//! - [`header`] - `Authorization` header parsing
//! - [`oauth10a`] - The OAuth 1.0a authenticator
//! - [`provider`] - Driver registry and selection
//! - [`request`] - Framework-independent request view
//! - [`signature`] - Signature methods and computation
//! - [`unauthorized`] - The deny-all authenticator

pub mod authenticator;
pub mod canonical;
pub mod credentials;
pub mod error;
pub mod header;
pub mod oauth10a;
pub mod provider;
pub mod request;
pub mod signature;
pub mod unauthorized;

pub use authenticator::{AuthDecision, RequestAuthenticator};
pub use credentials::{Credential, CredentialRepository, StaticCredentialRepository};
pub use error::{AuthError, CredentialError, ProviderError, SignatureError};
pub use header::{OAuthParameters, parse_authorization_header};
pub use oauth10a::{OAUTH10A_DRIVER, OAuth10aRequestAuthenticator};
pub use provider::{DriverFactory, DriverRegistry, Selection, provide_request_authenticator};
pub use request::RequestView;
pub use signature::{HmacSha1Method, SignatureMethod, SignatureMethods, compute_signature};
pub use unauthorized::{UNAUTHORIZED_DRIVER, UnauthorizedRequestAuthenticator};
