//! Health handlers: gateway-local and composite

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shopgate_core::HealthStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LocalHealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl From<&HealthStatus> for LocalHealthResponse {
    fn from(health: &HealthStatus) -> Self {
        Self {
            status: "ok",
            service: "gateway",
            timestamp: health.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompositeHealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl From<&HealthStatus> for CompositeHealthResponse {
    fn from(health: &HealthStatus) -> Self {
        let (status, backend) = if health.is_healthy() {
            ("ok", "reachable")
        } else {
            ("degraded", "unreachable")
        };
        Self {
            status,
            backend,
            timestamp: health.timestamp,
        }
    }
}

/// `/health` - answers as long as the process runs
pub async fn local_health() -> Json<LocalHealthResponse> {
    Json(LocalHealthResponse::from(&HealthStatus::local()))
}

/// `/api/health` - probes the backend within the health timeout
pub async fn composite_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<CompositeHealthResponse>) {
    let reachable = match state.upstream().probe_health().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Backend health probe failed");
            false
        }
    };

    let health = HealthStatus::composite(reachable);
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(CompositeHealthResponse::from(&health)))
}
