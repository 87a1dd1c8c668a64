//! Storage port for transactions.
//!
//! The store is the single source of truth for a transaction's status. Both
//! write operations must be atomic with respect to concurrent callers:
//! uniqueness of `transaction_id` and the single terminal transition are
//! enforced here, never by a read-then-write in the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{TerminalStatus, Transaction, TransactionStatus};

/// Result of [`TransactionStore::insert_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No record existed; the new one is persisted in `PROCESSING`.
    Inserted,
    /// A record with the same identifier already existed and was left untouched.
    Existing(TransactionStatus),
}

impl InsertOutcome {
    #[inline]
    pub fn inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted)
    }
}

/// Result of [`TransactionStore::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// The record was already terminal; nothing was written.
    AlreadyTerminal(TransactionStatus),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transaction not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TransactionStore: Send + Sync + 'static {
    /// Persists `tx` unless a record with its identifier exists.
    ///
    /// Under concurrent callers presenting the same identifier exactly one
    /// observes `Inserted`.
    async fn insert_if_absent(&self, tx: &Transaction) -> StoreResult<InsertOutcome>;

    /// Moves a `PROCESSING` record to `status`, stamping `processed_at`.
    ///
    /// A record that is already terminal is left unchanged.
    async fn transition(
        &self,
        transaction_id: &str,
        status: TerminalStatus,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome>;

    /// Returns the latest committed record, or `StoreError::NotFound`.
    async fn find(&self, transaction_id: &str) -> StoreResult<Transaction>;

    /// Records still in `PROCESSING` that were created at or before `created_before`,
    /// oldest first.
    async fn list_stuck(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>>;

    /// Cheap connectivity check.
    async fn ping(&self) -> StoreResult<()>;
}
