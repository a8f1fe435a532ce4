//! Framework-independent view of an inbound HTTP request.
//!
//! [`RequestView`] carries only what signature verification needs. The
//! boundary layer builds one from whatever request type it receives, so the
//! authenticators never depend on a particular server.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// Media type whose bodies contribute parameters to the signature.
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// The request facts used by the authenticators.
#[derive(Debug, Clone)]
pub struct RequestView {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestView {
    /// Create a view from its components.
    ///
    /// `uri` should be absolute (scheme and authority included). When it is
    /// not, the `Host` header supplies the authority during signing.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    /// Create a view from request parts and an already collected body.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts, body: Bytes) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            parts.headers.clone(),
            body,
        )
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The URI path, `/` when the URI has none.
    #[must_use]
    pub fn path(&self) -> &str {
        match self.uri.path() {
            "" => "/",
            path => path,
        }
    }

    /// The raw query string, empty when absent.
    #[must_use]
    pub fn query(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// First value of a header as a string, if present and valid.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the body is `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn is_form_encoded(&self) -> bool {
        self.header(http::header::CONTENT_TYPE.as_str())
            .and_then(|v| v.split(';').next())
            .is_some_and(|media| media.trim().eq_ignore_ascii_case(FORM_URLENCODED))
    }
}

impl<B: Into<Bytes>> From<http::Request<B>> for RequestView {
    fn from(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(content_type: Option<&str>) -> RequestView {
        let mut builder = http::Request::builder()
            .method("POST")
            .uri("https://api.example.com/v1/items?limit=10");
        if let Some(ct) = content_type {
            builder = builder.header("Content-Type", ct);
        }
        builder.body("a=1").unwrap().into()
    }

    #[test]
    fn test_should_expose_path_and_query() {
        let request = view(None);
        assert_eq!(request.path(), "/v1/items");
        assert_eq!(request.query(), "limit=10");
        assert_eq!(request.body().as_ref(), b"a=1");
    }

    #[test]
    fn test_should_look_up_headers_case_insensitively() {
        let request = view(Some("text/plain"));
        assert_eq!(request.header("content-type"), Some("text/plain"));
        assert_eq!(request.header("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_should_detect_form_encoded_body() {
        assert!(view(Some("application/x-www-form-urlencoded")).is_form_encoded());
        assert!(view(Some("Application/X-WWW-Form-Urlencoded; charset=utf-8")).is_form_encoded());
        assert!(!view(Some("application/json")).is_form_encoded());
        assert!(!view(None).is_form_encoded());
    }
}
