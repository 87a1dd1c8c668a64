use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, ErrorResponse};
use crate::services::WebhookPayload;
use crate::AppState;

/// Acknowledgement for an accepted delivery, first or duplicate.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    #[schema(example = "Webhook received and queued for processing")]
    pub message: String,
    #[schema(example = "txn_test_001")]
    pub transaction_id: String,
}

#[utoipa::path(
    post,
    path = "/v1/webhooks/transactions",
    request_body = WebhookPayload,
    responses(
        (status = 202, description = "Delivery accepted (first or duplicate)", body = WebhookAck),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn receive_transaction(
    State(state): State<AppState>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<WebhookAck>), AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let transaction_id = payload.transaction_id.clone();

    let acceptance = state.ingestion.accept(payload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(WebhookAck {
            message: acceptance.message().to_string(),
            transaction_id,
        }),
    ))
}
