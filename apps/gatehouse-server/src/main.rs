//! Gatehouse Server - OAuth 1.0a authentication gateway.
//!
//! This binary authenticates every incoming HTTP request with the configured
//! request authenticator driver and answers `200` or `401`. It is meant to sit
//! behind a reverse proxy as an authentication sub-request endpoint.
//! `GET /_gatehouse/health` answers without authentication; every other path,
//! including upstream `/health` routes, must be signed.
//!
//! # Usage
//!
//! ```text
//! REQUEST_AUTH_DRIVER=oauth10a CREDENTIALS_FILE=credentials.json gatehouse-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `REQUEST_AUTH_DRIVER` | `unauthorized` | Request authenticator driver (`oauth10a`, `unauthorized`) |
//! | `CREDENTIALS_FILE` | *(unset)* | JSON file with client credentials |
//! | `CLIENT_KEY` / `CLIENT_SECRET` | *(unset)* | A single client credential |
//! | `RESOURCE_OWNER_SECRET` | *(empty)* | Token secret for `CLIENT_KEY` |
//! | `FORWARDED_SCHEME` | `http` | Scheme assumed for origin-form request URIs |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod response;
mod service;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use gatehouse_auth::{Credential, CredentialRepository, DriverRegistry, StaticCredentialRepository};
use gatehouse_core::{AuthConfig, GatewayConfig};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use crate::service::{AuthGatewayService, HEALTH_CHECK_PATH};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Read a single credential from `CLIENT_KEY` / `CLIENT_SECRET` style
/// variables, resolved through `lookup`.
fn credential_from_vars(lookup: impl Fn(&str) -> Option<String>) -> Option<Credential> {
    let client_key = lookup("CLIENT_KEY").filter(|v| !v.is_empty())?;
    let client_secret = lookup("CLIENT_SECRET")?;
    let resource_owner_secret = lookup("RESOURCE_OWNER_SECRET").unwrap_or_default();

    Some(
        Credential::new(client_key, client_secret)
            .with_resource_owner_secret(resource_owner_secret),
    )
}

/// Build the credential repository from the credentials file and the
/// environment. An environment credential replaces a file entry with the same
/// client key.
fn build_credential_repository(
    config: &GatewayConfig,
    env_credential: Option<Credential>,
) -> Result<Arc<dyn CredentialRepository>> {
    let mut repository = match &config.credentials_file {
        Some(path) => StaticCredentialRepository::from_json_file(path)
            .with_context(|| format!("failed to load credentials from {}", path.display()))?,
        None => StaticCredentialRepository::default(),
    };

    if let Some(credential) = env_credential {
        info!(
            client_key = %credential.client_key,
            "configured client credential from environment"
        );
        repository.insert(credential);
    }

    if repository.is_empty() {
        warn!("no client credentials configured, every signed request will be rejected");
    } else {
        info!(credentials = repository.len(), "credential repository ready");
    }

    Ok(Arc::new(repository))
}

/// Run the accept loop, serving connections until `shutdown` completes.
async fn serve(
    listener: TcpListener,
    service: AuthGatewayService,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Resolve once Ctrl-C is received.
async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal, draining connections");
}

/// Send a bodiless `GET` to the gateway and return the raw HTTP response.
async fn fetch(addr: &str, path: &str, headers: &[(&str, &str)]) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let mut request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}

/// Perform a health check by connecting to the gateway and requesting the health endpoint.
///
/// Exits with code 0 if the response is 200 OK and reports the gateway as
/// running, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    let response = fetch(addr, HEALTH_CHECK_PATH, &[]).await?;

    if response.contains("200 OK") && response.contains("\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env();

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    let auth_config = AuthConfig::from_env();
    let credentials =
        build_credential_repository(&config, credential_from_vars(|k| std::env::var(k).ok()))?;

    let span = info_span!("request_auth", driver = auth_config.driver());
    let selection = DriverRegistry::new().select(&auth_config, &span, credentials);
    let fallback = selection.is_fallback();
    let driver = selection.authenticator().driver().to_owned();

    let service =
        AuthGatewayService::new(selection.into_authenticator(), &config.forwarded_scheme);

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        driver = %driver,
        fallback,
        version = VERSION,
        "starting Gatehouse Server",
    );

    serve(listener, service, shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use gatehouse_auth::{OAuth10aRequestAuthenticator, UnauthorizedRequestAuthenticator};

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    type Gateway = (
        String,
        tokio::sync::oneshot::Sender<()>,
        tokio::task::JoinHandle<Result<()>>,
    );

    async fn spawn_gateway(service: AuthGatewayService) -> Gateway {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, service, async {
            rx.await.ok();
        }));
        (addr, tx, handle)
    }

    #[test]
    fn test_should_read_credential_from_vars() {
        let credential = credential_from_vars(lookup(&[
            ("CLIENT_KEY", "key"),
            ("CLIENT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(credential.client_key, "key");
        assert_eq!(credential.client_secret, "secret");
        assert_eq!(credential.resource_owner_secret, "");
    }

    #[test]
    fn test_should_require_key_and_secret() {
        assert!(credential_from_vars(lookup(&[("CLIENT_KEY", "key")])).is_none());
        assert!(credential_from_vars(lookup(&[("CLIENT_SECRET", "secret")])).is_none());
        assert!(
            credential_from_vars(lookup(&[("CLIENT_KEY", ""), ("CLIENT_SECRET", "s")])).is_none()
        );
    }

    #[test]
    fn test_should_merge_file_and_env_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"file-key": {"client_secret": "file-secret"}, "shared": {"client_secret": "old"}}"#,
        )
        .unwrap();
        let config = GatewayConfig {
            credentials_file: Some(file.path().to_path_buf()),
            ..GatewayConfig::default()
        };

        let repository =
            build_credential_repository(&config, Some(Credential::new("shared", "new"))).unwrap();
        assert_eq!(
            repository.get("file-key").unwrap().unwrap().client_secret,
            "file-secret"
        );
        assert_eq!(repository.get("shared").unwrap().unwrap().client_secret, "new");
    }

    #[test]
    fn test_should_fail_on_unreadable_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig {
            credentials_file: Some(dir.path().join("missing.json")),
            ..GatewayConfig::default()
        };
        assert!(build_credential_repository(&config, None).is_err());
    }

    #[tokio::test]
    async fn test_should_serve_health_check_and_reject_unsigned_requests() {
        let service = AuthGatewayService::new(
            Arc::new(OAuth10aRequestAuthenticator::new(Arc::new(
                StaticCredentialRepository::default(),
            ))),
            "http",
        );
        let (addr, shutdown, handle) = spawn_gateway(service).await;

        assert!(run_health_check(&addr).await.is_ok());

        let response = fetch(&addr, "/aps/2/collections/service-plans", &[])
            .await
            .unwrap();
        assert!(response.starts_with("HTTP/1.1 401"));
        assert!(response.contains("Unauthenticated, missing oauth 1.0a signature."));

        for upstream in ["/health", "/health?x=1", "/_health?x=1", "/_gatehouse/health?x=1"] {
            let response = fetch(&addr, upstream, &[]).await.unwrap();
            assert!(response.starts_with("HTTP/1.1 401"), "{upstream}: {response}");
        }

        shutdown.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_should_reject_signed_request_with_deny_all_driver() {
        let service =
            AuthGatewayService::new(Arc::new(UnauthorizedRequestAuthenticator::default()), "http");
        let (addr, shutdown, handle) = spawn_gateway(service).await;

        let response = fetch(
            &addr,
            "/items",
            &[("Authorization", "OAuth oauth_consumer_key=\"k\"")],
        )
        .await
        .unwrap();
        assert!(response.starts_with("HTTP/1.1 401"));
        assert!(response.contains(r#"{"detail":"Unauthenticated."}"#));

        shutdown.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
