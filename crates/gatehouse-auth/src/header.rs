//! OAuth 1.0a `Authorization` header parsing.
//!
//! The header has the format:
//!
//! ```text
//! OAuth oauth_consumer_key="...", oauth_signature_method="HMAC-SHA1",
//!   oauth_timestamp="...", oauth_nonce="...", oauth_version="1.0",
//!   oauth_signature="..."
//! ```
//!
//! Parameters may appear in any order, with or without whitespace after the
//! commas. Values are kept exactly as transmitted (still percent-encoded); the
//! signature engine decodes them when it builds the base string, and the
//! presented signature is compared in its transmitted form.

use crate::error::AuthError;

/// Authentication scheme expected in front of the parameter list.
pub const OAUTH_SCHEME: &str = "OAuth";

/// Header parameter that never takes part in the signature base string.
const REALM: &str = "realm";

/// Parameters carried by an OAuth 1.0a `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthParameters {
    /// `oauth_consumer_key`: the client identifier.
    pub consumer_key: String,
    /// `oauth_signature_method`, for example `HMAC-SHA1`.
    pub signature_method: String,
    /// `oauth_timestamp`.
    pub timestamp: String,
    /// `oauth_nonce`.
    pub nonce: String,
    /// `oauth_version`.
    pub version: String,
    /// `oauth_signature`, percent-encoded as transmitted.
    pub signature: String,
    /// Any other parameters (`oauth_token`, `realm`, ...) in header order.
    pub extra: Vec<(String, String)>,
}

impl OAuthParameters {
    /// Protocol parameters that are part of the signature base string.
    ///
    /// Everything except `oauth_signature` and `realm`, values still
    /// percent-encoded.
    pub fn signable(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_signature_method", self.signature_method.as_str()),
            ("oauth_timestamp", self.timestamp.as_str()),
            ("oauth_nonce", self.nonce.as_str()),
            ("oauth_version", self.version.as_str()),
        ]
        .into_iter()
        .chain(
            self.extra
                .iter()
                .filter(|(name, _)| name != REALM)
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}

/// Parse an OAuth 1.0a `Authorization` header value.
///
/// # Errors
///
/// Returns [`AuthError::MalformedSignature`] if the scheme is not `OAuth`,
/// the parameter list is missing, a parameter lacks `=` or a name, a required
/// parameter is duplicated, or a required parameter is absent.
///
/// # Examples
///
/// ```
/// use gatehouse_auth::header::parse_authorization_header;
///
/// let parsed = parse_authorization_header(
///     r#"OAuth oauth_consumer_key="key", oauth_signature_method="HMAC-SHA1", oauth_timestamp="1", oauth_nonce="n", oauth_version="1.0", oauth_signature="c2ln""#,
/// )
/// .unwrap();
/// assert_eq!(parsed.consumer_key, "key");
/// assert_eq!(parsed.signature, "c2ln");
/// ```
pub fn parse_authorization_header(header: &str) -> Result<OAuthParameters, AuthError> {
    let (scheme, rest) = header
        .trim()
        .split_once(char::is_whitespace)
        .ok_or(AuthError::MalformedSignature)?;

    if !scheme.eq_ignore_ascii_case(OAUTH_SCHEME) {
        return Err(AuthError::MalformedSignature);
    }

    let mut consumer_key = None;
    let mut signature_method = None;
    let mut timestamp = None;
    let mut nonce = None;
    let mut version = None;
    let mut signature = None;
    let mut extra = Vec::new();

    for parameter in rest.split(',') {
        let (name, value) = parameter
            .split_once('=')
            .ok_or(AuthError::MalformedSignature)?;
        let name = unquote(name);
        let value = unquote(value);

        if name.is_empty() {
            return Err(AuthError::MalformedSignature);
        }

        let slot = match name {
            "oauth_consumer_key" => &mut consumer_key,
            "oauth_signature_method" => &mut signature_method,
            "oauth_timestamp" => &mut timestamp,
            "oauth_nonce" => &mut nonce,
            "oauth_version" => &mut version,
            "oauth_signature" => &mut signature,
            _ => {
                extra.push((name.to_owned(), value.to_owned()));
                continue;
            }
        };

        if slot.replace(value.to_owned()).is_some() {
            return Err(AuthError::MalformedSignature);
        }
    }

    Ok(OAuthParameters {
        consumer_key: consumer_key.ok_or(AuthError::MalformedSignature)?,
        signature_method: signature_method.ok_or(AuthError::MalformedSignature)?,
        timestamp: timestamp.ok_or(AuthError::MalformedSignature)?,
        nonce: nonce.ok_or(AuthError::MalformedSignature)?,
        version: version.ok_or(AuthError::MalformedSignature)?,
        signature: signature.ok_or(AuthError::MalformedSignature)?,
        extra,
    })
}

/// Strip surrounding whitespace and double quotes.
fn unquote(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}
