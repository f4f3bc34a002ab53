//! shopgate-api - HTTP layer of the shopgate gateway
//!
//! Builds the axum router that classifies every inbound request and hands
//! it to the local health handler, the composite health handler, or the
//! proxy handler. The backend is reached through the `Upstream` trait held
//! in [`AppState`], so the router itself never touches the network.
//!
//! # Usage
//!
//! ```ignore
//! use shopgate_api::{create_router, AppState};
//!
//! let state = AppState::from_config(config)?;
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod state;
pub mod testing;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::any;
use axum::Router;
use shopgate_core::routing::{COMPOSITE_HEALTH_PATH, LOCAL_HEALTH_PATH};
use tower_http::trace::TraceLayer;

/// Create the gateway router with the given application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route(LOCAL_HEALTH_PATH, any(handlers::health::local_health))
        .route(COMPOSITE_HEALTH_PATH, any(handlers::health::composite_health))
        // /api/* proxying and 404s
        .fallback(handlers::dispatch::dispatch)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
