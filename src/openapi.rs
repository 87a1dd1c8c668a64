//! OpenAPI document served at `/api-docs/openapi.json`, browsable at `/docs`.

use utoipa::OpenApi;

use crate::domain::{Transaction, TransactionStatus};
use crate::error::ErrorResponse;
use crate::handlers::webhook::WebhookAck;
use crate::health::{HealthResponse, ReadinessResponse};
use crate::services::WebhookPayload;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Transaction Webhook Ingestion API",
        description = "Accepts transaction webhooks idempotently and reports their processing status."
    ),
    paths(
        crate::handlers::health,
        crate::handlers::ready,
        crate::handlers::webhook::receive_transaction,
        crate::handlers::transactions::get_transaction,
    ),
    components(schemas(
        HealthResponse,
        ReadinessResponse,
        WebhookPayload,
        WebhookAck,
        Transaction,
        TransactionStatus,
        ErrorResponse,
    )),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Transactions", description = "Webhook ingestion and status lookup")
    )
)]
pub struct ApiDoc;
