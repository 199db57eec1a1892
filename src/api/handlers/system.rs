//! System endpoints: health check and reward catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::Reward;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    store: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Pings the key-value store and returns service health, version, and current timestamp. Answers 503 while the store is unreachable.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let reachable = state.ledger_service.store_reachable().await;
    let (code, status, store) = if reachable {
        (StatusCode::OK, "healthy", "up")
    } else {
        tracing::warn!("health check: store unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            store: store.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/rewards`: Reward catalog.
#[utoipa::path(
    get,
    path = "/config/rewards",
    tag = "System",
    summary = "List rewards",
    description = "Returns every reward customers can redeem points for, cheapest first.",
    responses(
        (status = 200, description = "Reward catalog", body = Vec<Reward>),
    )
)]
pub async fn rewards_handler(State(state): State<AppState>) -> impl IntoResponse {
    let rewards: Vec<Reward> = state.ledger_service.catalog().rewards().to_vec();
    (StatusCode::OK, Json(rewards))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/rewards", get(rewards_handler))
}
