pub mod transaction;

pub use transaction::{TerminalStatus, Transaction, TransactionStatus, UnknownStatus};
