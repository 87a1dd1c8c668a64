//! Transaction domain entity.
//! Framework-agnostic representation of an ingested webhook transaction.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Processing status of a transaction.
///
/// `Processing` is the only non-terminal state. A record leaves it at most
/// once, to either `Processed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Processing,
    Processed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Processing => "PROCESSING",
            TransactionStatus::Processed => "PROCESSED",
            TransactionStatus::Failed => "FAILED",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Processing)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(TransactionStatus::Processing),
            "PROCESSED" => Ok(TransactionStatus::Processed),
            "FAILED" => Ok(TransactionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A status a transaction may be moved into by the deferred processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Processed,
    Failed,
}

impl From<TerminalStatus> for TransactionStatus {
    fn from(status: TerminalStatus) -> Self {
        match status {
            TerminalStatus::Processed => TransactionStatus::Processed,
            TerminalStatus::Failed => TransactionStatus::Failed,
        }
    }
}

/// A transaction as recorded by the store, keyed by `transaction_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    #[schema(example = "txn_test_001")]
    pub transaction_id: String,
    #[schema(example = "acc_user_001")]
    pub source_account: String,
    #[schema(example = "acc_merchant_001")]
    pub destination_account: String,
    #[schema(value_type = String, example = "100.5")]
    pub amount: BigDecimal,
    #[schema(example = "USD")]
    pub currency: String,
    pub status: TransactionStatus,
    #[serde(with = "timestamp")]
    #[schema(value_type = String, example = "2024-01-15T10:30:00Z")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::option")]
    #[schema(value_type = Option<String>, example = "2024-01-15T10:30:30Z")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Builds a freshly received transaction in `PROCESSING`, stamped now.
    pub fn new(
        transaction_id: String,
        source_account: String,
        destination_account: String,
        amount: BigDecimal,
        currency: String,
    ) -> Self {
        Self {
            transaction_id,
            source_account,
            destination_account,
            amount,
            currency,
            status: TransactionStatus::Processing,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Applies the terminal transition in place.
    ///
    /// Returns `false` without touching the record when it is already terminal.
    /// `processed_at` is clamped so it never precedes `created_at`.
    pub fn finish(&mut self, status: TerminalStatus, processed_at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status.into();
        self.processed_at = Some(processed_at.max(self.created_at));
        true
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ` rendering used for every timestamp on the wire.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn format(at: &DateTime<Utc>) -> String {
        at.format(FORMAT).to_string()
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, FORMAT).map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            at: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => serializer.serialize_str(&super::format(at)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
