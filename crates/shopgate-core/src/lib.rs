//! shopgate-core - Core traits and types for the shopgate gateway
//!
//! This crate holds everything the gateway decides without touching the
//! network: how a path is classified, which headers cross the proxy
//! boundary, what a health status looks like, and the immutable
//! configuration built once at startup. The `Upstream` trait is the seam
//! between the HTTP layer and the client that talks to the backend.

pub mod config;
pub mod error;
pub mod headers;
pub mod models;
pub mod routing;
pub mod upstream;

pub use config::{GatewayConfig, RawConfig};
pub use error::{ConfigError, UpstreamError, UpstreamResult};
pub use models::{HealthStatus, ProxyRequest, UpstreamResponse};
pub use routing::Route;
pub use upstream::Upstream;
