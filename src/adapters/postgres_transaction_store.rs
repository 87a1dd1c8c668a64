//! Postgres implementation of TransactionStore.
//!
//! Uniqueness rides on the `transactions` primary key (`ON CONFLICT DO NOTHING`),
//! and the terminal transition is a single conditional `UPDATE`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{TerminalStatus, Transaction, TransactionStatus};
use crate::ports::{InsertOutcome, StoreError, StoreResult, TransactionStore, TransitionOutcome};

const SELECT_COLUMNS: &str = "SELECT transaction_id, source_account, destination_account, amount, \
     currency, status, created_at, processed_at FROM transactions";

/// Postgres-backed transaction store.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn current_status(&self, transaction_id: &str) -> StoreResult<Option<TransactionStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM transactions WHERE transaction_id = $1")
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await?;

        status
            .map(|s| s.parse().map_err(|e| StoreError::Backend(format!("{e}"))))
            .transpose()
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn insert_if_absent(&self, tx: &Transaction) -> StoreResult<InsertOutcome> {
        let inserted: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (
                transaction_id, source_account, destination_account, amount,
                currency, status, created_at, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NULL)
            ON CONFLICT (transaction_id) DO NOTHING
            RETURNING transaction_id
            "#,
        )
        .bind(&tx.transaction_id)
        .bind(&tx.source_account)
        .bind(&tx.destination_account)
        .bind(&tx.amount)
        .bind(&tx.currency)
        .bind(TransactionStatus::Processing.as_str())
        .bind(tx.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_some() {
            return Ok(InsertOutcome::Inserted);
        }

        // The conflicting row is committed by the time ON CONFLICT resolves, so a
        // fresh statement always sees it.
        match self.current_status(&tx.transaction_id).await? {
            Some(status) => Ok(InsertOutcome::Existing(status)),
            None => Err(StoreError::Backend(format!(
                "insert of {} conflicted but no row is visible",
                tx.transaction_id
            ))),
        }
    }

    async fn transition(
        &self,
        transaction_id: &str,
        status: TerminalStatus,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome> {
        let status = TransactionStatus::from(status);
        let updated: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE transactions
            SET status = $2, processed_at = GREATEST($3, created_at)
            WHERE transaction_id = $1 AND status = 'PROCESSING'
            RETURNING transaction_id
            "#,
        )
        .bind(transaction_id)
        .bind(status.as_str())
        .bind(processed_at)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            return Ok(TransitionOutcome::Applied);
        }

        match self.current_status(transaction_id).await? {
            Some(current) if current.is_terminal() => Ok(TransitionOutcome::AlreadyTerminal(current)),
            Some(current) => Err(StoreError::Backend(format!(
                "conditional update skipped {transaction_id} while it is {current}"
            ))),
            None => Err(StoreError::NotFound(transaction_id.to_string())),
        }
    }

    async fn find(&self, transaction_id: &str) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_COLUMNS} WHERE transaction_id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotFound(transaction_id.to_string()))?
            .into_domain()
    }

    async fn list_stuck(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_COLUMNS} WHERE status = 'PROCESSING' AND created_at <= $1 \
             ORDER BY created_at ASC LIMIT $2"
        ))
        .bind(created_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    transaction_id: String,
    source_account: String,
    destination_account: String,
    amount: BigDecimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<Transaction> {
        let status = self
            .status
            .parse()
            .map_err(|e| StoreError::Backend(format!("{e}")))?;

        Ok(Transaction {
            transaction_id: self.transaction_id,
            source_account: self.source_account,
            destination_account: self.destination_account,
            amount: self.amount,
            currency: self.currency,
            status,
            created_at: self.created_at,
            processed_at: self.processed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_map_to_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let row = TransactionRow {
            transaction_id: "txn_1".to_string(),
            source_account: "a".to_string(),
            destination_account: "b".to_string(),
            amount: BigDecimal::from(1),
            currency: "USD".to_string(),
            status: "pending".to_string(),
            created_at: Utc::now(),
            processed_at: None,
        };

        assert!(matches!(row.into_domain(), Err(StoreError::Backend(_))));
    }
}
