//! shopgate-proxy - Backend client for the shopgate gateway
//!
//! Implements `Upstream` by forwarding requests over HTTP to the private
//! product backend with `reqwest`. Every call is a single attempt bounded
//! by the timeouts in `GatewayConfig`; failures come back as
//! `UpstreamError` and carry detail meant for logs only.

mod client;

pub use client::BackendClient;
