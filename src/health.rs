use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use utoipa::ToSchema;

use crate::domain::transaction::timestamp;
use crate::ports::TransactionStore;

const STORE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "HEALTHY")]
    pub status: String,
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub current_time: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Dispatched processors that have not written their terminal state yet.
    pub in_flight_processors: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    #[schema(example = "ready")]
    pub status: String,
    #[schema(example = "connected")]
    pub store: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadinessResponse {
    pub fn is_ready(&self) -> bool {
        self.error.is_none()
    }
}

/// Liveness: answers whenever the process is up.
pub fn check_liveness(start_time: Instant, in_flight_processors: usize) -> HealthResponse {
    HealthResponse {
        status: "HEALTHY".to_string(),
        current_time: timestamp::format(&chrono::Utc::now()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        in_flight_processors,
    }
}

/// Readiness: the store must answer a ping within the timeout.
pub async fn check_readiness(store: &dyn TransactionStore) -> ReadinessResponse {
    let start = Instant::now();

    let error = match timeout(STORE_CHECK_TIMEOUT, store.ping()).await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some("timeout".to_string()),
    };

    ReadinessResponse {
        status: if error.is_none() { "ready" } else { "unavailable" }.to_string(),
        store: if error.is_none() { "connected" } else { "disconnected" }.to_string(),
        latency_ms: start.elapsed().as_millis() as u64,
        error,
    }
}
