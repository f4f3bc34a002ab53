//! Application state for the gateway API

use std::sync::Arc;

use shopgate_core::{GatewayConfig, Upstream, UpstreamResult};
use shopgate_proxy::BackendClient;

/// Application state shared across all handlers.
///
/// Read-only after construction; cloning is two `Arc` bumps.
#[derive(Clone)]
pub struct AppState {
    config: Arc<GatewayConfig>,
    upstream: Arc<dyn Upstream>,
}

impl AppState {
    /// Create state from a config and any upstream implementation
    pub fn new(config: Arc<GatewayConfig>, upstream: Arc<dyn Upstream>) -> Self {
        Self { config, upstream }
    }

    /// Create state that forwards to the backend named in `config`
    pub fn from_config(config: GatewayConfig) -> UpstreamResult<Self> {
        let client = BackendClient::new(&config)?;
        Ok(Self::new(Arc::new(config), Arc::new(client)))
    }

    /// Get the gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Get the upstream requests are forwarded to
    pub fn upstream(&self) -> &dyn Upstream {
        self.upstream.as_ref()
    }
}
