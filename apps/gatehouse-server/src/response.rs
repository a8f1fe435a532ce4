//! JSON response construction.

use bytes::Bytes;
use gatehouse_auth::AuthError;
use gatehouse_auth::header::OAUTH_SCHEME;
use http_body_util::Full;

/// Response body type used by the gateway.
pub type GatewayBody = Full<Bytes>;

/// Content type for every gateway response.
pub const CONTENT_TYPE: &str = "application/json";

/// Build a JSON response with the given status.
#[must_use]
pub fn json_response(
    status: http::StatusCode,
    value: &serde_json::Value,
) -> http::Response<GatewayBody> {
    let mut response = http::Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(CONTENT_TYPE),
    );
    response
}

/// Convert an authentication failure into a `401` response.
///
/// The body is `{"detail": "<message>"}` and a `WWW-Authenticate: OAuth`
/// challenge is attached.
#[must_use]
pub fn unauthorized_response(error: AuthError) -> http::Response<GatewayBody> {
    let mut response = json_response(
        error.status(),
        &serde_json::json!({ "detail": error.to_string() }),
    );
    response.headers_mut().insert(
        http::header::WWW_AUTHENTICATE,
        http::HeaderValue::from_static(OAUTH_SCHEME),
    );
    response
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(response: http::Response<GatewayBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_should_render_unauthorized_detail() {
        let response = unauthorized_response(AuthError::InvalidSignature);
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(http::header::WWW_AUTHENTICATE).unwrap(),
            "OAuth"
        );
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            CONTENT_TYPE
        );
        assert_eq!(
            tokio_test::block_on(body_json(response))["detail"],
            "Unauthenticated, the provided signature is not valid."
        );
    }

    #[test]
    fn test_should_render_deny_all_detail() {
        let response = unauthorized_response(AuthError::Unauthenticated);
        assert_eq!(
            tokio_test::block_on(body_json(response))["detail"],
            "Unauthenticated."
        );
    }
}
