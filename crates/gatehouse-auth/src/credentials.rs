//! Credential repository trait and implementations.
//!
//! This module defines the [`CredentialRepository`] trait for resolving client
//! credentials from a consumer key, along with a [`StaticCredentialRepository`]
//! for testing and development use cases.
//!
//! A lookup has three outcomes: a credential, no credential (`Ok(None)`, an
//! unknown client), or a store failure. Authenticators treat the last two the
//! same way but repositories should keep them apart.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::CredentialError;

/// Shared secrets for one OAuth client.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Credential {
    /// The consumer key the client presents as `oauth_consumer_key`.
    pub client_key: String,
    /// The consumer secret.
    pub client_secret: String,
    /// The token secret; empty for two-legged OAuth.
    #[serde(default)]
    pub resource_owner_secret: String,
}

impl Credential {
    /// Create a two-legged credential (empty resource owner secret).
    pub fn new(client_key: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_key: client_key.into(),
            client_secret: client_secret.into(),
            resource_owner_secret: String::new(),
        }
    }

    /// Set the resource owner (token) secret.
    #[must_use]
    pub fn with_resource_owner_secret(mut self, secret: impl Into<String>) -> Self {
        self.resource_owner_secret = secret.into();
        self
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_key", &self.client_key)
            .field("client_secret", &"...")
            .field("resource_owner_secret", &"...")
            .finish()
    }
}

/// Trait for looking up client credentials by consumer key.
///
/// Implementations may back this with a database, configuration file, secret
/// manager, or any other credential store. Lookups are synchronous; timeouts
/// and retries, if any, belong to the implementation.
pub trait CredentialRepository: Send + Sync {
    /// Retrieve the credential for the given consumer key.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the store itself fails. An unknown key
    /// is `Ok(None)`, not an error.
    fn get(&self, client_key: &str) -> Result<Option<Credential>, CredentialError>;
}

impl<F> CredentialRepository for F
where
    F: Fn(&str) -> Result<Option<Credential>, CredentialError> + Send + Sync,
{
    fn get(&self, client_key: &str) -> Result<Option<Credential>, CredentialError> {
        self(client_key)
    }
}

/// A simple in-memory credential repository backed by a `HashMap`.
///
/// Suitable for testing and development environments. For production use,
/// implement [`CredentialRepository`] on top of a secure credential store.
///
/// # Examples
///
/// ```
/// use gatehouse_auth::credentials::{Credential, CredentialRepository, StaticCredentialRepository};
///
/// let repository = StaticCredentialRepository::new([Credential::new("key", "secret")]);
///
/// let credential = repository.get("key").unwrap().unwrap();
/// assert_eq!(credential.client_secret, "secret");
/// assert!(repository.get("other").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialRepository {
    credentials: HashMap<String, Credential>,
}

/// Layouts accepted by [`StaticCredentialRepository::from_json_str`].
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum CredentialDocument {
    List(Vec<Credential>),
    Keyed(HashMap<String, SecretEntry>),
}

#[derive(serde::Deserialize)]
struct SecretEntry {
    client_secret: String,
    #[serde(default)]
    resource_owner_secret: String,
}

impl StaticCredentialRepository {
    /// Create a repository from an iterable of credentials, keyed by client key.
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|credential| (credential.client_key.clone(), credential))
                .collect(),
        }
    }

    /// Parse credentials from JSON.
    ///
    /// Two layouts are accepted: an array of credential objects, or an object
    /// mapping each client key to its secrets.
    ///
    /// ```json
    /// [{"client_key": "k", "client_secret": "s", "resource_owner_secret": ""}]
    /// {"k": {"client_secret": "s"}}
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Parse`] if the JSON matches neither layout.
    pub fn from_json_str(json: &str) -> Result<Self, CredentialError> {
        let document: CredentialDocument = serde_json::from_str(json)?;
        Ok(match document {
            CredentialDocument::List(credentials) => Self::new(credentials),
            CredentialDocument::Keyed(entries) => {
                Self::new(entries.into_iter().map(|(client_key, entry)| Credential {
                    client_key,
                    client_secret: entry.client_secret,
                    resource_owner_secret: entry.resource_owner_secret,
                }))
            }
        })
    }

    /// Load credentials from a JSON file, see [`Self::from_json_str`].
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Io`] if the file cannot be read, or
    /// [`CredentialError::Parse`] if its contents are invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Add or replace a credential.
    pub fn insert(&mut self, credential: Credential) -> Option<Credential> {
        self.credentials
            .insert(credential.client_key.clone(), credential)
    }

    /// Number of stored credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether the repository holds no credentials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl CredentialRepository for StaticCredentialRepository {
    fn get(&self, client_key: &str) -> Result<Option<Credential>, CredentialError> {
        Ok(self.credentials.get(client_key).cloned())
    }
}
