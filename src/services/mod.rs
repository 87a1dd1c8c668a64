pub mod ingestion;
pub mod processor;
pub mod query;

pub use ingestion::{Acceptance, IngestionGate, WebhookPayload};
pub use processor::{DeferredProcessor, ExternalCall, ExternalCallError, SimulatedExternalCall};
pub use query::QueryService;
