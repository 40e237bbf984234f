use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub cache: String,
}

/// Health check with dependency probes. Degraded Redis still reports 503
/// even though most flows survive it; the operator should know.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.auth_service.db.ping().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!("Health check: database ping failed: {}", e);
            "down"
        }
    };

    let cache = match state.cache.ping().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!("Health check: cache ping failed: {}", e);
            "down"
        }
    };

    let healthy = database == "up" && cache == "up";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
            cache: cache.to_string(),
        }),
    )
}
