//! Test utilities for shopgate-api
//!
//! Provides helpers for running integration tests against a live gateway
//! and against backend test doubles.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use shopgate_core::GatewayConfig;
use tokio::net::TcpListener;

use crate::{create_router, AppState};

/// Error type for test setup helpers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A server on an ephemeral local port that shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve an axum Router
    ///
    /// # Example
    ///
    /// ```ignore
    /// use shopgate_api::testing::TestServer;
    ///
    /// let backend = TestServer::start(Router::new().route("/health", get(|| async { "ok" }))).await?;
    /// let response = backend.client.get(backend.url("/health")).send().await?;
    /// ```
    pub async fn start(router: Router) -> std::io::Result<Self> {
        Self::start_with_timeout(router, Duration::from_secs(10)).await
    }

    /// Serve an axum Router; `client` gives up on requests after `timeout`
    pub async fn start_with_timeout(router: Router, timeout: Duration) -> std::io::Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
        });

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(std::io::Error::other)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Start a gateway in front of the backend named in `config`
    pub async fn gateway(config: GatewayConfig) -> Result<Self, BoxError> {
        let state = AppState::from_config(config)?;
        Ok(Self::start(create_router(state)).await?)
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL for `path_and_query` on this server
    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url(), path_and_query)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal if not already done
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Abort the task if still running
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Config pointing at `backend` with timeouts short enough for tests
pub fn test_config(backend: SocketAddr) -> GatewayConfig {
    let url = reqwest::Url::parse(&format!("http://{}/", backend))
        .expect("socket address is a valid URL authority");
    let mut config = GatewayConfig::for_backend(url);
    config.proxy_timeout = Duration::from_secs(2);
    config.connect_timeout = Duration::from_secs(1);
    config.health_timeout = Duration::from_millis(500);
    config
}

/// An address on the loopback interface nothing is listening on
pub async fn unused_addr() -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}
