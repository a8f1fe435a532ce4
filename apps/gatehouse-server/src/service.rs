//! Authentication gateway service implementing the hyper `Service` trait.
//!
//! Every request except a bare `GET` of [`HEALTH_CHECK_PATH`] is handed to the
//! configured [`RequestAuthenticator`]. Authenticated requests get `200` with a small
//! JSON acknowledgement; rejected ones get `401` with `{"detail": "..."}`.
//!
//! Requests arrive in origin form (`/path?query`), so the service rebuilds
//! the absolute URI from the `Host` header and the configured scheme before
//! authenticating. Reverse proxies that terminate TLS should either send the
//! `X-Forwarded-*` headers or run the gateway with `FORWARDED_SCHEME=https`.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use gatehouse_auth::{RequestAuthenticator, RequestView};
use http::uri::PathAndQuery;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tracing::{debug, info, warn};

use crate::response::{GatewayBody, json_response, unauthorized_response};

/// Reserved health check path, outside any namespace the gateway protects.
pub const HEALTH_CHECK_PATH: &str = "/_gatehouse/health";

/// Hyper service that authenticates every request it receives.
#[derive(Debug, Clone)]
pub struct AuthGatewayService {
    authenticator: Arc<dyn RequestAuthenticator>,
    default_scheme: Arc<str>,
}

impl AuthGatewayService {
    /// Create a new service around an authenticator.
    ///
    /// `default_scheme` is used for requests whose URI carries no scheme.
    pub fn new(authenticator: Arc<dyn RequestAuthenticator>, default_scheme: &str) -> Self {
        Self {
            authenticator,
            default_scheme: Arc::from(default_scheme),
        }
    }

    /// Authenticate a request whose body has already been collected.
    #[must_use]
    pub fn handle(
        &self,
        parts: &http::request::Parts,
        body: Bytes,
    ) -> http::Response<GatewayBody> {
        let uri = absolute_uri(&parts.uri, &parts.headers, &self.default_scheme);
        let request = RequestView::new(parts.method.clone(), uri, parts.headers.clone(), body);

        match self.authenticator.authenticate(&request) {
            Ok(()) => {
                debug!(method = %parts.method, path = request.path(), "Request authenticated");
                json_response(
                    http::StatusCode::OK,
                    &serde_json::json!({
                        "authenticated": true,
                        "driver": self.authenticator.driver(),
                    }),
                )
            }
            Err(err) => {
                info!(
                    method = %parts.method,
                    path = request.path(),
                    reason = %err,
                    "Request rejected"
                );
                unauthorized_response(err)
            }
        }
    }

    fn health_check_response(&self) -> http::Response<GatewayBody> {
        json_response(
            http::StatusCode::OK,
            &serde_json::json!({
                "status": "running",
                "driver": self.authenticator.driver(),
            }),
        )
    }
}

impl hyper::service::Service<http::Request<Incoming>> for AuthGatewayService {
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        if is_health_check(req.method(), req.uri()) {
            let response = self.health_check_response();
            return Box::pin(async { Ok(response) });
        }

        let service = self.clone();
        Box::pin(async move {
            let (parts, incoming) = req.into_parts();
            let response = match incoming.collect().await {
                Ok(collected) => service.handle(&parts, collected.to_bytes()),
                Err(e) => {
                    warn!(error = %e, "Failed to read request body");
                    let detail = format!("Failed to read request body: {e}");
                    json_response(
                        http::StatusCode::BAD_REQUEST,
                        &serde_json::json!({ "detail": detail }),
                    )
                }
            };
            Ok(response)
        })
    }
}

/// Check if the request is a health check: exactly `GET` of
/// [`HEALTH_CHECK_PATH`] with no query.
fn is_health_check(method: &http::Method, uri: &http::Uri) -> bool {
    *method == http::Method::GET && uri.path() == HEALTH_CHECK_PATH && uri.query().is_none()
}

/// Turn an origin-form URI into an absolute one using the `Host` header.
///
/// URIs that already carry a scheme, and requests without a usable `Host`
/// header, are returned unchanged.
fn absolute_uri(
    uri: &http::Uri,
    headers: &http::HeaderMap,
    default_scheme: &str,
) -> http::Uri {
    if uri.scheme().is_some() {
        return uri.clone();
    }

    let Some(host) = headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
    else {
        return uri.clone();
    };

    let path_and_query = uri.path_and_query().map_or("/", PathAndQuery::as_str);

    http::Uri::builder()
        .scheme(default_scheme)
        .authority(host)
        .path_and_query(path_and_query)
        .build()
        .unwrap_or_else(|_| uri.clone())
}

#[cfg(test)]
mod tests {
    use gatehouse_auth::{
        Credential, OAuth10aRequestAuthenticator, StaticCredentialRepository,
        UnauthorizedRequestAuthenticator,
    };

    use super::*;

    const AUTHORIZATION: &str = "OAuth oauth_consumer_key=\"wotAQOwTUXZrkZqfOMrpEAtTC362SJi8\", \
        oauth_signature_method=\"HMAC-SHA1\", oauth_timestamp=\"1686919540\", \
        oauth_nonce=\"RZQd4m3S0Iu\", oauth_version=\"1.0\", \
        oauth_signature=\"XcvHhpsvfYz2%2F1PiI19axOJNe0E%3D\"";

    fn oauth_service(default_scheme: &str) -> AuthGatewayService {
        let credentials = StaticCredentialRepository::new([Credential::new(
            "wotAQOwTUXZrkZqfOMrpEAtTC362SJi8",
            "4oV1gtQxZxjxkl0jYqfd0FukNADAu0NmTML9Xm6KCA0n1CcEOSEaGAUC9nca8Do2\
             W6GocxO1RYJvbpDsFbZ5pvxZIISlycvbIE2F6OLRNMQld8uJE9eVNNxKu72xxrTI",
        )]);
        AuthGatewayService::new(
            Arc::new(OAuth10aRequestAuthenticator::new(Arc::new(credentials))),
            default_scheme,
        )
    }

    fn parts(headers: &[(&str, &str)]) -> http::request::Parts {
        let mut builder = http::Request::builder()
            .method("GET")
            .uri("/aps/2/collections/service-plans");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    async fn body_json(response: http::Response<GatewayBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_should_accept_signed_request_in_origin_form() {
        let parts = parts(&[
            ("Host", "cosmopolitan.aks.int.zone"),
            ("Authorization", AUTHORIZATION),
        ]);
        let response = oauth_service("https").handle(&parts, Bytes::new());
        assert_eq!(response.status(), http::StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["driver"], "oauth10a");
    }

    #[tokio::test]
    async fn test_should_accept_signed_request_behind_proxy() {
        let parts = parts(&[
            ("Host", "10.0.0.12:8080"),
            ("X-Forwarded-Proto", "https"),
            ("X-Forwarded-Host", "cosmopolitan.aks.int.zone"),
            ("Authorization", AUTHORIZATION),
        ]);
        let response = oauth_service("http").handle(&parts, Bytes::new());
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_reject_signature_for_wrong_scheme() {
        let parts = parts(&[
            ("Host", "cosmopolitan.aks.int.zone"),
            ("Authorization", AUTHORIZATION),
        ]);
        let response = oauth_service("http").handle(&parts, Bytes::new());
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await["detail"],
            "Unauthenticated, the provided signature is not valid."
        );
    }

    #[tokio::test]
    async fn test_should_reject_request_without_authorization() {
        let parts = parts(&[("Host", "cosmopolitan.aks.int.zone")]);
        let response = oauth_service("https").handle(&parts, Bytes::new());
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(http::header::WWW_AUTHENTICATE).unwrap(),
            "OAuth"
        );
        assert_eq!(
            body_json(response).await["detail"],
            "Unauthenticated, missing oauth 1.0a signature."
        );
    }

    #[tokio::test]
    async fn test_should_reject_everything_with_deny_all_driver() {
        let service = AuthGatewayService::new(
            Arc::new(UnauthorizedRequestAuthenticator::default()),
            "https",
        );
        let parts = parts(&[
            ("Host", "cosmopolitan.aks.int.zone"),
            ("Authorization", AUTHORIZATION),
        ]);
        let response = service.handle(&parts, Bytes::new());
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["detail"], "Unauthenticated.");
    }

    #[tokio::test]
    async fn test_should_report_driver_in_health_check() {
        let response = oauth_service("http").health_check_response();
        assert_eq!(response.status(), http::StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["driver"], "oauth10a");
    }

    #[test]
    fn test_should_only_treat_reserved_path_as_health_check() {
        let get = http::Method::GET;
        assert!(is_health_check(&get, &"/_gatehouse/health".parse().unwrap()));
        assert!(!is_health_check(&http::Method::POST, &"/_gatehouse/health".parse().unwrap()));
        assert!(!is_health_check(&get, &"/_gatehouse/health?x=1".parse().unwrap()));
        for upstream in ["/health", "/health?x=1", "/_health", "/_health?x=1", "/aps/2/health"] {
            assert!(!is_health_check(&get, &upstream.parse().unwrap()), "{upstream}");
        }
    }

    #[tokio::test]
    async fn test_should_reject_unsigned_requests_to_upstream_health_paths() {
        let service = oauth_service("http");
        for upstream in ["/health", "/health?x=1", "/_health"] {
            let (parts, ()) = http::Request::builder()
                .method("GET")
                .uri(upstream)
                .header("Host", "cosmopolitan.aks.int.zone")
                .body(())
                .unwrap()
                .into_parts();
            let response = service.handle(&parts, Bytes::new());
            assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED, "{upstream}");
            assert_eq!(
                body_json(response).await["detail"],
                "Unauthenticated, missing oauth 1.0a signature."
            );
        }
    }

    #[test]
    fn test_should_build_absolute_uri_from_host_header() {
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::HOST,
            http::HeaderValue::from_static("api.example.com"),
        );

        let uri = absolute_uri(&"/items?page=2".parse().unwrap(), &headers, "https");
        assert_eq!(uri.to_string(), "https://api.example.com/items?page=2");
    }

    #[test]
    fn test_should_keep_uri_without_host_or_with_scheme() {
        let headers = http::HeaderMap::new();
        let origin: http::Uri = "/items".parse().unwrap();
        assert_eq!(absolute_uri(&origin, &headers, "http"), origin);

        let absolute: http::Uri = "http://other.example.com/items".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::HOST,
            http::HeaderValue::from_static("api.example.com"),
        );
        assert_eq!(absolute_uri(&absolute, &headers, "https"), absolute);
    }
}
