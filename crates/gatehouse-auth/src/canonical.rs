//! Signature base string construction for OAuth 1.0a (RFC 5849, section 3.4.1).
//!
//! The base string is three percent-encoded components joined by `&`:
//!
//! ```text
//! METHOD&encode(base-string-uri)&encode(normalized-parameters)
//! ```
//!
//! The base string URI is taken from the forwarded headers when a reverse
//! proxy supplied both of them, otherwise from the request itself. Parameters
//! come from the `Authorization` header, the query string, and form-encoded
//! bodies; they are decoded, re-encoded with the RFC 3986 unreserved set, and
//! sorted by name then value.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::header::OAuthParameters;
use crate::request::RequestView;

/// Characters that must be percent-encoded in OAuth signing.
///
/// Everything except the RFC 3986 unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`).
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Header carrying the scheme the client used in front of a reverse proxy.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Header carrying the host the client used in front of a reverse proxy.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Scheme assumed when neither the URI nor the forwarded headers provide one.
const DEFAULT_SCHEME: &str = "http";

/// The request target a client signed: scheme, authority, and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningTarget {
    /// URI scheme (`http`, `https`).
    pub scheme: String,
    /// Host, optionally with a port.
    pub host: String,
    /// Path component, never including the query.
    pub path: String,
    /// Whether the target was recomputed from forwarded headers.
    pub forwarded: bool,
}

impl SigningTarget {
    /// The effective request URL, `{scheme}://{host}{path}`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }

    /// The base string URI: lowercase scheme and host, default port dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_auth::canonical::SigningTarget;
    ///
    /// let target = SigningTarget {
    ///     scheme: "HTTP".to_owned(),
    ///     host: "Example.COM:80".to_owned(),
    ///     path: "/r%20v/X".to_owned(),
    ///     forwarded: false,
    /// };
    /// assert_eq!(target.base_string_uri(), "http://example.com/r%20v/X");
    /// ```
    #[must_use]
    pub fn base_string_uri(&self) -> String {
        let scheme = self.scheme.to_ascii_lowercase();
        let host = self.host.to_ascii_lowercase();
        let host = strip_default_port(&scheme, &host);
        let path = if self.path.is_empty() {
            "/"
        } else {
            &self.path
        };
        format!("{scheme}://{host}{path}")
    }
}

/// Resolve the target the client signed.
///
/// When both `X-Forwarded-Proto` and `X-Forwarded-Host` are present the target
/// is `{proto}://{host}{original-path}`; either header alone is ignored. When
/// a forwarded header lists several hops, the first (client-facing) entry is
/// used. Without forwarded headers the URI's own scheme and authority are
/// used, falling back to the `Host` header for origin-form URIs.
#[must_use]
pub fn resolve_target(request: &RequestView) -> SigningTarget {
    let path = request.path().to_owned();

    let forwarded_proto = request.header(X_FORWARDED_PROTO).map(first_hop);
    let forwarded_host = request.header(X_FORWARDED_HOST).map(first_hop);

    if let (Some(proto), Some(host)) = (forwarded_proto, forwarded_host) {
        return SigningTarget {
            scheme: proto.to_owned(),
            host: host.to_owned(),
            path,
            forwarded: true,
        };
    }

    let uri = request.uri();
    let scheme = uri.scheme_str().unwrap_or(DEFAULT_SCHEME).to_owned();
    let host = uri
        .authority()
        .map(|authority| match authority.port() {
            Some(port) => format!("{}:{port}", authority.host()),
            None => authority.host().to_owned(),
        })
        .or_else(|| request.header(http::header::HOST.as_str()).map(str::to_owned))
        .unwrap_or_default();

    SigningTarget {
        scheme,
        host,
        path,
        forwarded: false,
    }
}

/// Collect the decoded parameters that take part in the signature.
///
/// Sources, per RFC 5849 section 3.4.1.3.1: the `Authorization` header
/// parameters (minus `oauth_signature` and `realm`), the query string, and the
/// body when it is `application/x-www-form-urlencoded`.
#[must_use]
pub fn collect_parameters(
    request: &RequestView,
    oauth: &OAuthParameters,
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = oauth
        .signable()
        .map(|(name, value)| (percent_decode(name), percent_decode(value)))
        .collect();

    params.extend(form_urlencoded::parse(request.query().as_bytes()).into_owned());

    if request.is_form_encoded() {
        params.extend(form_urlencoded::parse(request.body()).into_owned());
    }

    params
}

/// Normalize decoded parameters into the `name=value&...` form.
///
/// Names and values are encoded first, then sorted by name with ties broken
/// by value. Repeated pairs are all kept.
///
/// # Examples
///
/// ```
/// use gatehouse_auth::canonical::normalize_parameters;
///
/// let params = vec![
///     ("b".to_owned(), "2".to_owned()),
///     ("a".to_owned(), "x y".to_owned()),
///     ("a".to_owned(), "1".to_owned()),
/// ];
/// assert_eq!(normalize_parameters(&params), "a=1&a=x%20y&b=2");
/// ```
#[must_use]
pub fn normalize_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| (percent_encode(name), percent_encode(value)))
        .collect();

    encoded.sort_unstable();

    encoded
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the signature base string from its three components.
#[must_use]
pub fn build_signature_base_string(
    method: &str,
    base_string_uri: &str,
    normalized_parameters: &str,
) -> String {
    format!(
        "{}&{}&{}",
        percent_encode(&method.to_ascii_uppercase()),
        percent_encode(base_string_uri),
        percent_encode(normalized_parameters)
    )
}

/// Percent-encode a string with the RFC 3986 unreserved set.
///
/// # Examples
///
/// ```
/// use gatehouse_auth::canonical::percent_encode;
///
/// assert_eq!(percent_encode("-._~"), "-._~");
/// assert_eq!(percent_encode("a b/c="), "a%20b%2Fc%3D");
/// ```
#[must_use]
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// Percent-decode a string, replacing invalid UTF-8 sequences.
#[must_use]
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// First entry of a comma-separated forwarded header.
fn first_hop(value: &str) -> &str {
    value.split(',').next().unwrap_or(value).trim()
}

/// Drop `:80` for `http` and `:443` for `https`.
fn strip_default_port<'a>(scheme: &str, host: &'a str) -> &'a str {
    let default_port = match scheme {
        "http" => ":80",
        "https" => ":443",
        _ => return host,
    };
    host.strip_suffix(default_port).unwrap_or(host)
}
