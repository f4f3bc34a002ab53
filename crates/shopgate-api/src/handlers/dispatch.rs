//! Fallback dispatch for paths the static routes do not cover

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use shopgate_core::Route;

use super::{health, proxy};
use crate::error::ApiError;
use crate::state::AppState;

/// Classify the path and hand the request to the matching handler.
///
/// `/health` and `/api/health` are registered directly on the router; this
/// covers `/api/health/...`, every other `/api/*` path, and the 404 case.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let route = Route::classify(request.uri().path());
    tracing::trace!(route = route.as_str(), path = %request.uri().path(), "Dispatching");

    match route {
        Route::LocalHealth => health::local_health().await.into_response(),
        Route::CompositeHealth => health::composite_health(State(state)).await.into_response(),
        Route::Proxy => proxy::proxy_request(State(state), request)
            .await
            .into_response(),
        Route::NotFound => ApiError::NotFound.into_response(),
    }
}
