use axum::{
    extract::{Path, State},
    Json,
};

use crate::domain::Transaction;
use crate::error::{AppError, ErrorResponse};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/v1/transactions/{transaction_id}",
    params(
        ("transaction_id" = String, Path, description = "Identifier supplied by the webhook sender")
    ),
    responses(
        (status = 200, description = "Current record", body = Transaction),
        (status = 404, description = "Unknown transaction", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>, AppError> {
    let tx = state.query.get(&transaction_id).await?;
    Ok(Json(tx))
}
