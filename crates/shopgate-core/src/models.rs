//! Transient request/response and health types

use std::net::SocketAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;

/// An inbound `/api/*` request as it will be sent to the backend.
///
/// Lives for the duration of one client request. The body is carried as
/// the exact bytes the client sent.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Path as received, including the `/api/` prefix
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Peer address of the client connection, when known
    pub client_addr: Option<SocketAddr>,
}

impl ProxyRequest {
    /// `path?query` as it appears on the wire
    pub fn path_and_query(&self) -> String {
        match self.query.as_deref() {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }
}

/// A complete backend response, body fully read
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Health snapshot computed for a single `/health` or `/api/health` call
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub gateway_up: bool,
    /// `None` when the backend was not probed for this snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_reachable: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    /// Gateway-only status; the process answering is proof of life
    pub fn local() -> Self {
        Self {
            gateway_up: true,
            backend_reachable: None,
            timestamp: Utc::now(),
        }
    }

    /// Status including the outcome of a backend probe
    pub fn composite(backend_reachable: bool) -> Self {
        Self {
            gateway_up: true,
            backend_reachable: Some(backend_reachable),
            timestamp: Utc::now(),
        }
    }

    /// True when every component checked for this snapshot is healthy
    pub fn is_healthy(&self) -> bool {
        self.gateway_up && self.backend_reachable.unwrap_or(true)
    }
}
