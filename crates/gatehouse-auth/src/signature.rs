//! OAuth 1.0a signature computation.
//!
//! Signature methods are looked up by the `oauth_signature_method` the client
//! presented. HMAC-SHA1 is built in:
//!
//! ```text
//! key       = encode(client_secret) "&" encode(resource_owner_secret)
//! signature = encode(Base64(HMAC-SHA1(key, base_string)))
//! ```
//!
//! The final percent-encoding leaves only unreserved characters bare, so the
//! result compares directly against the `oauth_signature` header value.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;
use tracing::debug;

use crate::canonical::{
    build_signature_base_string, collect_parameters, normalize_parameters, percent_encode,
    resolve_target,
};
use crate::credentials::Credential;
use crate::error::SignatureError;
use crate::header::OAuthParameters;
use crate::request::RequestView;

/// Name of the built-in HMAC-SHA1 signature method.
pub const HMAC_SHA1: &str = "HMAC-SHA1";

type HmacSha1 = Hmac<Sha1>;

/// A signature method keyed by its `oauth_signature_method` name.
pub trait SignatureMethod: Send + Sync + fmt::Debug {
    /// The `oauth_signature_method` value this method handles.
    fn name(&self) -> &str;

    /// Sign a base string, returning the signature before percent-encoding.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] if the signature cannot be produced.
    fn sign(&self, base_string: &str, credential: &Credential) -> Result<String, SignatureError>;
}

/// HMAC-SHA1 signing (RFC 5849, section 3.4.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha1Method;

impl SignatureMethod for HmacSha1Method {
    fn name(&self) -> &str {
        HMAC_SHA1
    }

    fn sign(&self, base_string: &str, credential: &Credential) -> Result<String, SignatureError> {
        let key = build_signing_key(&credential.client_secret, &credential.resource_owner_secret);
        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
        mac.update(base_string.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// Build the HMAC signing key from the client and resource owner secrets.
///
/// # Examples
///
/// ```
/// use gatehouse_auth::signature::build_signing_key;
///
/// assert_eq!(build_signing_key("j49sk3j29djd", "dh893hdasih9"), "j49sk3j29djd&dh893hdasih9");
/// assert_eq!(build_signing_key("s&cret", ""), "s%26cret&");
/// ```
#[must_use]
pub fn build_signing_key(client_secret: &str, resource_owner_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(client_secret),
        percent_encode(resource_owner_secret)
    )
}

/// The set of signature methods an authenticator accepts.
#[derive(Clone)]
pub struct SignatureMethods {
    methods: HashMap<String, Arc<dyn SignatureMethod>>,
}

impl SignatureMethods {
    /// A set containing only the built-in HMAC-SHA1 method.
    #[must_use]
    pub fn new() -> Self {
        let mut methods = Self::empty();
        methods.register(Arc::new(HmacSha1Method));
        methods
    }

    /// A set with no methods; every signature fails to verify.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a method under its name, returning any method it replaces.
    pub fn register(&mut self, method: Arc<dyn SignatureMethod>) -> Option<Arc<dyn SignatureMethod>> {
        self.methods.insert(method.name().to_owned(), method)
    }

    /// Look up a method by its `oauth_signature_method` name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn SignatureMethod>> {
        self.methods.get(name)
    }

    /// Names of all registered methods, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for SignatureMethods {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignatureMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Recompute the signature a client should have sent for this request.
///
/// The result is percent-encoded and directly comparable to
/// [`OAuthParameters::signature`]. The computation is deterministic: timestamp
/// and nonce are inputs taken from the header, never generated here.
///
/// # Errors
///
/// Returns [`SignatureError::UnsupportedMethod`] if the presented signature
/// method is not registered, or any error raised by the method itself.
pub fn compute_signature(
    request: &RequestView,
    oauth: &OAuthParameters,
    credential: &Credential,
    methods: &SignatureMethods,
) -> Result<String, SignatureError> {
    let method = methods
        .get(&oauth.signature_method)
        .ok_or_else(|| SignatureError::UnsupportedMethod(oauth.signature_method.clone()))?;

    let target = resolve_target(request);
    if target.forwarded {
        debug!(url = %target.url(), "Computed url from forwarded headers");
    }

    let normalized = normalize_parameters(&collect_parameters(request, oauth));
    debug!(parameters = %normalized, "Normalized request parameters");

    let base_string = build_signature_base_string(
        request.method().as_str(),
        &target.base_string_uri(),
        &normalized,
    );
    debug!(base_string = %base_string, "Built signature base string");

    let signature = method.sign(&base_string, credential)?;
    Ok(percent_encode(&signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::parse_authorization_header;

    #[derive(Debug)]
    struct Plaintext;

    impl SignatureMethod for Plaintext {
        fn name(&self) -> &str {
            "PLAINTEXT"
        }

        fn sign(&self, _: &str, credential: &Credential) -> Result<String, SignatureError> {
            Ok(build_signing_key(
                &credential.client_secret,
                &credential.resource_owner_secret,
            ))
        }
    }

    fn rfc_credential() -> Credential {
        Credential::new("9djdj82h48djs9d2", "j49sk3j29djd")
            .with_resource_owner_secret("dh893hdasih9")
    }

    #[test]
    fn test_should_sign_rfc5849_example_base_string() {
        let base_string = "POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q\
            %26a3%3Da%26b5%3D%253D%25253D%26c%2540%3D%26c2%3D%26oauth_consumer_\
            key%3D9djdj82h48djs9d2%26oauth_nonce%3D7d8f3e4a%26oauth_signature_m\
            ethod%3DHMAC-SHA1%26oauth_timestamp%3D137131201%26oauth_token%3Dkkk\
            9d7dh3k39sjv7";
        let signature = HmacSha1Method.sign(base_string, &rfc_credential()).unwrap();
        assert_eq!(signature, "r6/TJjbCOr97/+UU0NsvSne7s5g=");
    }

    #[test]
    fn test_should_compute_percent_encoded_signature_for_request() {
        let header = "OAuth realm=\"Example\", oauth_consumer_key=\"9djdj82h48djs9d2\", \
            oauth_token=\"kkk9d7dh3k39sjv7\", oauth_signature_method=\"HMAC-SHA1\", \
            oauth_timestamp=\"137131201\", oauth_nonce=\"7d8f3e4a\", \
            oauth_version=\"1.0\", oauth_signature=\"ignored\"";
        let request: RequestView = http::Request::builder()
            .method("POST")
            .uri("http://example.com:80/request?b5=%3D%253D&a3=a&c%40=&a2=r%20b")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Authorization", header)
            .body("c2&a3=2+q")
            .unwrap()
            .into();
        let oauth = parse_authorization_header(header).unwrap();

        let signature =
            compute_signature(&request, &oauth, &rfc_credential(), &SignatureMethods::new())
                .unwrap();
        assert_eq!(signature, "OB33pYjWAnf%2BxtOHN4Gmbdil168%3D");

        let again =
            compute_signature(&request, &oauth, &rfc_credential(), &SignatureMethods::new())
                .unwrap();
        assert_eq!(signature, again);
    }

    #[test]
    fn test_should_reject_unregistered_signature_method() {
        let header = "OAuth oauth_consumer_key=\"k\", oauth_signature_method=\"RSA-SHA1\", \
            oauth_timestamp=\"1\", oauth_nonce=\"n\", oauth_version=\"1.0\", oauth_signature=\"s\"";
        let request: RequestView = http::Request::builder()
            .uri("https://example.com/")
            .body("")
            .unwrap()
            .into();
        let oauth = parse_authorization_header(header).unwrap();

        let result = compute_signature(
            &request,
            &oauth,
            &Credential::new("k", "secret"),
            &SignatureMethods::new(),
        );
        assert_eq!(
            result,
            Err(SignatureError::UnsupportedMethod("RSA-SHA1".to_owned()))
        );
    }

    #[test]
    fn test_should_register_additional_signature_methods() {
        let mut methods = SignatureMethods::new();
        assert!(methods.register(Arc::new(Plaintext)).is_none());
        assert_eq!(methods.names(), vec!["HMAC-SHA1", "PLAINTEXT"]);

        let sig = methods
            .get("PLAINTEXT")
            .unwrap()
            .sign("ignored", &Credential::new("k", "a b"))
            .unwrap();
        assert_eq!(sig, "a%20b&");
    }

    #[test]
    fn test_should_have_no_methods_when_empty() {
        assert!(SignatureMethods::empty().get(HMAC_SHA1).is_none());
    }
}
