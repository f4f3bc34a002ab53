//! Proxy handler - forwards `/api/*` to the backend

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use http_body_util::LengthLimitError;
use shopgate_core::{ProxyRequest, UpstreamResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// Forward the request as-is and relay the backend's answer.
///
/// The inbound body is buffered (up to `max_body_bytes`) so it can be sent
/// byte for byte; the backend body is buffered too, so a response that
/// breaks off midway still becomes a 502 instead of a truncated 200.
pub async fn proxy_request(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();

    let limit = state.config().max_body_bytes;
    if declared_length(&parts.headers).is_some_and(|len| len > limit) {
        return Err(ApiError::PayloadTooLarge { limit });
    }
    let body = read_body(body, limit).await?;

    let proxy_request = ProxyRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
        client_addr,
    };
    tracing::debug!(
        method = %proxy_request.method,
        target = %proxy_request.path_and_query(),
        bytes = proxy_request.body.len(),
        "Forwarding to backend"
    );

    let upstream = state.upstream().forward(proxy_request).await?;
    Ok(relay(upstream))
}

/// Turn a backend response into the client response
fn relay(upstream: UpstreamResponse) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = upstream.headers;
    response
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let inner = e.into_inner();
        if inner.is::<LengthLimitError>() {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::BadRequest(inner.to_string())
        }
    })
}
