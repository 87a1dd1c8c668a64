pub mod transactions;
pub mod webhook;

use crate::health::{check_liveness, check_readiness, HealthResponse, ReadinessResponse};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(check_liveness(state.start_time, state.processor.in_flight()))
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Store is reachable", body = ReadinessResponse),
        (status = 503, description = "Store is unreachable", body = ReadinessResponse)
    ),
    tag = "Health"
)]
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let report = check_readiness(state.store.as_ref()).await;

    // Return 503 if the store is down, 200 otherwise
    let status_code = if report.is_ready() {
        StatusCode::OK
    } else {
        tracing::warn!(error = ?report.error, "Readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(report))
}
