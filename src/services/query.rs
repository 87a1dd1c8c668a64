use std::sync::Arc;

use crate::domain::Transaction;
use crate::error::AppError;
use crate::ports::TransactionStore;
use crate::validation::validate_identifier;

/// Read-only lookups, always served from the store.
pub struct QueryService {
    store: Arc<dyn TransactionStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, transaction_id: &str) -> Result<Transaction, AppError> {
        validate_identifier("transaction_id", transaction_id)?;
        Ok(self.store.find(transaction_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTransactionStore;
    use crate::domain::{TerminalStatus, TransactionStatus};
    use bigdecimal::BigDecimal;
    use chrono::Utc;

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let service = QueryService::new(Arc::new(InMemoryTransactionStore::new()));

        let err = service.get("nonexistent").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Transaction nonexistent not found");
    }

    #[tokio::test]
    async fn blank_identifier_is_rejected() {
        let service = QueryService::new(Arc::new(InMemoryTransactionStore::new()));
        assert!(matches!(service.get(" ").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn reflects_latest_committed_state() {
        let store = InMemoryTransactionStore::new();
        let tx = Transaction::new(
            "txn_1".to_string(),
            "a".to_string(),
            "b".to_string(),
            BigDecimal::from(7),
            "USD".to_string(),
        );
        store.insert_if_absent(&tx).await.unwrap();
        let service = QueryService::new(Arc::new(store.clone()));

        assert_eq!(
            service.get("txn_1").await.unwrap().status,
            TransactionStatus::Processing
        );

        store
            .transition("txn_1", TerminalStatus::Processed, Utc::now())
            .await
            .unwrap();

        let latest = service.get("txn_1").await.unwrap();
        assert_eq!(latest.status, TransactionStatus::Processed);
        assert!(latest.processed_at.is_some());
    }
}
