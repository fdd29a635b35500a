use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use super::types::*;
use crate::state::AppState;

/// Liveness and backend connectivity
#[utoipa::path(
    tag = "Service",
    get,
    path = "/health",
    responses(
        (status = 200, description = "Backend reachable", body = HealthResponse),
        (status = 503, description = "Backend unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.source.source_type().to_string();

    match state.source.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                database: "connected".to_string(),
                backend,
            }),
        ),
        Err(e) => {
            warn!("Health check failed for {} backend: {}", backend, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    ok: false,
                    database: "unreachable".to_string(),
                    backend,
                }),
            )
        }
    }
}

/// Service banner
#[utoipa::path(
    tag = "Service",
    get,
    path = "/",
    responses((status = 200, description = "Service name and version", body = ServiceInfo))
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "tablegate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/swagger-ui".to_string(),
    })
}
