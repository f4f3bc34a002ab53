//! Header rules at the proxy boundary.
//!
//! Hop-by-hop headers describe a single transport connection and are
//! dropped in both directions, together with any header the `Connection`
//! header names. `host` and `content-length` are dropped as well; the
//! outbound client and the response encoder derive them again from the
//! target URL and the buffered body. Everything else crosses unchanged,
//! duplicates included.

use std::net::IpAddr;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};

/// `x-forwarded-for`
pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
/// `x-forwarded-host`
pub static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
/// `x-forwarded-proto`
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true if `name` must never be forwarded by a proxy
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Header names listed in the `Connection` header(s), lowercased
fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Copy `source` without hop-by-hop, framing, and `Connection`-listed headers
fn end_to_end(source: &HeaderMap) -> HeaderMap {
    let listed = connection_tokens(source);
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if is_hop_by_hop(name)
            || *name == header::HOST
            || *name == header::CONTENT_LENGTH
            || listed.iter().any(|t| t == name.as_str())
        {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers to send to the backend for an inbound request.
///
/// Adds the client IP to `x-forwarded-for` (appending to what the client
/// sent), records the inbound `host` as `x-forwarded-host`, and sets
/// `x-forwarded-proto` when the client did not.
pub fn forwarded_request_headers(inbound: &HeaderMap, client_ip: Option<IpAddr>) -> HeaderMap {
    let mut out = end_to_end(inbound);

    if let Some(ip) = client_ip {
        let chain = match joined(inbound, &X_FORWARDED_FOR) {
            Some(prior) => format!("{}, {}", prior, ip),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            out.insert(X_FORWARDED_FOR.clone(), value);
        }
    }

    if !out.contains_key(&X_FORWARDED_HOST) {
        if let Some(host) = inbound.get(header::HOST) {
            out.insert(X_FORWARDED_HOST.clone(), host.clone());
        }
    }

    if !out.contains_key(&X_FORWARDED_PROTO) {
        out.insert(X_FORWARDED_PROTO.clone(), HeaderValue::from_static("http"));
    }

    out
}

/// Headers to relay to the client for a backend response.
///
/// With `keep_length` the backend's `content-length` is relayed as well.
/// Set it for responses without a body (see [`is_bodiless`]), where the
/// length cannot be derived from what the gateway sends.
pub fn relayed_response_headers(upstream: &HeaderMap, keep_length: bool) -> HeaderMap {
    let mut out = end_to_end(upstream);
    if keep_length {
        for value in upstream.get_all(header::CONTENT_LENGTH) {
            out.append(header::CONTENT_LENGTH, value.clone());
        }
    }
    out
}

/// Returns true if a response to `method` with `status` never has a body
pub fn is_bodiless(method: &Method, status: StatusCode) -> bool {
    *method == Method::HEAD || status == StatusCode::NOT_MODIFIED
}

/// All values of a header joined with ", ", or `None` if absent
fn joined(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}
