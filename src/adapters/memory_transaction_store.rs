//! In-memory implementation of TransactionStore.
//!
//! Backs tests and `STORE_BACKEND=memory` local runs. Every write goes through
//! a single shard lock of the map, which is what makes insert-if-absent and
//! the terminal transition atomic.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{TerminalStatus, Transaction, TransactionStatus};
use crate::ports::{InsertOutcome, StoreError, StoreResult, TransactionStore, TransitionOutcome};

#[derive(Clone, Default)]
pub struct InMemoryTransactionStore {
    records: Arc<DashMap<String, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert_if_absent(&self, tx: &Transaction) -> StoreResult<InsertOutcome> {
        match self.records.entry(tx.transaction_id.clone()) {
            Entry::Occupied(existing) => Ok(InsertOutcome::Existing(existing.get().status)),
            Entry::Vacant(slot) => {
                let mut record = tx.clone();
                record.status = TransactionStatus::Processing;
                record.processed_at = None;
                slot.insert(record);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn transition(
        &self,
        transaction_id: &str,
        status: TerminalStatus,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome> {
        let mut record = self
            .records
            .get_mut(transaction_id)
            .ok_or_else(|| StoreError::NotFound(transaction_id.to_string()))?;

        if record.finish(status, processed_at) {
            Ok(TransitionOutcome::Applied)
        } else {
            Ok(TransitionOutcome::AlreadyTerminal(record.status))
        }
    }

    async fn find(&self, transaction_id: &str) -> StoreResult<Transaction> {
        self.records
            .get(transaction_id)
            .map(|record| record.value().clone())
            .ok_or_else(|| StoreError::NotFound(transaction_id.to_string()))
    }

    async fn list_stuck(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let mut stuck: Vec<Transaction> = self
            .records
            .iter()
            .filter(|r| r.status == TransactionStatus::Processing && r.created_at <= created_before)
            .map(|r| r.value().clone())
            .collect();

        stuck.sort_by_key(|tx| tx.created_at);
        stuck.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(stuck)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
