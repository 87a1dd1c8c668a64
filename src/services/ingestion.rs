//! Idempotent ingestion of transaction webhooks.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::domain::{Transaction, TransactionStatus};
use crate::error::AppError;
use crate::ports::{InsertOutcome, TransactionStore};
use crate::services::processor::DeferredProcessor;
use crate::validation::{
    validate_currency_code, validate_identifier, validate_positive_amount, ValidationError,
};

/// Body of `POST /v1/webhooks/transactions`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookPayload {
    #[schema(example = "txn_test_001")]
    pub transaction_id: String,
    #[schema(example = "acc_user_001")]
    pub source_account: String,
    #[schema(example = "acc_merchant_001")]
    pub destination_account: String,
    #[schema(value_type = f64, example = 100.50)]
    pub amount: BigDecimal,
    #[schema(example = "USD")]
    pub currency: String,
}

impl WebhookPayload {
    /// Checks structural well-formedness and builds the record to insert.
    pub fn into_transaction(self) -> Result<Transaction, ValidationError> {
        validate_identifier("transaction_id", &self.transaction_id)?;
        validate_identifier("source_account", &self.source_account)?;
        validate_identifier("destination_account", &self.destination_account)?;
        validate_positive_amount(&self.amount)?;
        let currency = validate_currency_code(&self.currency)?;

        Ok(Transaction::new(
            self.transaction_id,
            self.source_account,
            self.destination_account,
            self.amount.normalized(),
            currency,
        ))
    }
}

/// What the caller is told about an accepted delivery. Every variant is a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// First sighting; a processor was dispatched.
    Queued,
    /// Redelivery of an identifier already on record.
    Duplicate(TransactionStatus),
}

impl Acceptance {
    pub fn message(&self) -> &'static str {
        match self {
            Acceptance::Queued => "Webhook received and queued for processing",
            Acceptance::Duplicate(TransactionStatus::Processing) => {
                "Transaction already being processed"
            }
            Acceptance::Duplicate(_) => "Transaction already processed",
        }
    }
}

pub struct IngestionGate {
    store: Arc<dyn TransactionStore>,
    processor: DeferredProcessor,
}

impl IngestionGate {
    pub fn new(store: Arc<dyn TransactionStore>, processor: DeferredProcessor) -> Self {
        Self { store, processor }
    }

    /// Validates, records and schedules a webhook delivery.
    ///
    /// Exactly one delivery per `transaction_id` dispatches a processor; the call
    /// never waits on that processor.
    pub async fn accept(&self, payload: WebhookPayload) -> Result<Acceptance, AppError> {
        let tx = payload.into_transaction()?;

        match self.store.insert_if_absent(&tx).await? {
            InsertOutcome::Inserted => {
                info!(
                    transaction_id = %tx.transaction_id,
                    amount = %tx.amount,
                    currency = %tx.currency,
                    "Transaction recorded; dispatching processor"
                );
                self.processor.dispatch(tx.transaction_id);
                Ok(Acceptance::Queued)
            }
            InsertOutcome::Existing(status) => {
                debug!(transaction_id = %tx.transaction_id, status = %status, "Duplicate webhook delivery");
                Ok(Acceptance::Duplicate(status))
            }
        }
    }
}
