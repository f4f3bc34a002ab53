//! Integration tests for the shopgate gateway
//!
//! The tests in `tests/` start a real gateway on an ephemeral port in front
//! of one of the backend test doubles below and talk to it over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopgate-tests
//! ```
//!
//! # Backend doubles
//!
//! - [`echo_backend`] - reflects method, URI and body back to the caller
//! - [`truncating_backend`] - promises a body it never finishes sending

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Request header that makes the echo backend answer with that status
pub const ECHO_STATUS_HEADER: &str = "x-echo-status";

/// How the echo backend behaves
#[derive(Debug, Clone, Copy)]
pub struct EchoBehavior {
    /// Delay before answering `/health`
    pub health_delay: Duration,
    /// Status returned by `/health`
    pub health_status: StatusCode,
    /// Delay before answering any `/api/*` request
    pub api_delay: Duration,
}

impl Default for EchoBehavior {
    fn default() -> Self {
        Self {
            health_delay: Duration::ZERO,
            health_status: StatusCode::OK,
            api_delay: Duration::ZERO,
        }
    }
}

/// Echo backend with default behavior
pub fn echo_backend() -> Router {
    echo_backend_with(EchoBehavior::default())
}

/// Backend double standing in for the product service.
///
/// `/api/*` answers with the request body unchanged and reports what it
/// received in `x-echo-*` headers: method, URI, `x-forwarded-for`,
/// `x-forwarded-host` and `content-type`. The status is 200 unless the
/// request carries [`ECHO_STATUS_HEADER`].
pub fn echo_backend_with(behavior: EchoBehavior) -> Router {
    Router::new()
        .route(
            "/health",
            get(move || async move {
                tokio::time::sleep(behavior.health_delay).await;
                (behavior.health_status, "ok")
            }),
        )
        .route(
            "/api/{*rest}",
            any(
                move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
                    tokio::time::sleep(behavior.api_delay).await;
                    echo(method, uri, headers, body)
                },
            ),
        )
}

fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let status = headers
        .get(ECHO_STATUS_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let mut out = HeaderMap::new();
    out.insert("x-echo-method", header_value(method.as_str()));
    out.insert("x-echo-uri", header_value(&uri.to_string()));
    for (from, to) in [
        ("x-forwarded-for", "x-echo-forwarded-for"),
        ("x-forwarded-host", "x-echo-forwarded-host"),
        ("content-type", "x-echo-content-type"),
    ] {
        if let Some(value) = headers.get(from) {
            out.insert(to, value.clone());
        }
    }

    (status, out, body)
}

fn header_value(s: &str) -> HeaderValue {
    HeaderValue::from_str(s).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
}

/// Raw TCP backend that sends headers announcing `declared` body bytes,
/// writes only `sent` bytes, then closes the connection.
pub async fn truncating_backend(
    declared: usize,
    sent: usize,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                // Read until the end of the request head; bodies are ignored
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
                    declared
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.write_all(&vec![b'x'; sent]).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Ok((addr, handle))
}
