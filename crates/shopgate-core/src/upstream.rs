//! Upstream trait - the seam between the HTTP layer and the backend client

use async_trait::async_trait;

use crate::error::UpstreamResult;
use crate::models::{ProxyRequest, UpstreamResponse};

/// Something requests can be forwarded to.
///
/// Implementations make exactly one attempt per call and bound it with a
/// timeout; retries are left to the client of the gateway. Dropping the
/// returned future abandons the in-flight call.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Forward a request and return the complete response.
    ///
    /// Any status code the backend answers with is a successful forward;
    /// only transport-level failures are errors.
    async fn forward(&self, request: ProxyRequest) -> UpstreamResult<UpstreamResponse>;

    /// Lightweight reachability check against the backend's health endpoint.
    ///
    /// Returns `Ok(())` only for a 2xx answer within the probe timeout.
    async fn probe_health(&self) -> UpstreamResult<()>;
}
