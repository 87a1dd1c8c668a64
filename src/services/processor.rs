use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::domain::TerminalStatus;
use crate::ports::{TransactionStore, TransitionOutcome};

#[derive(Debug, thiserror::Error)]
#[error("external call failed: {0}")]
pub struct ExternalCallError(pub String);

/// The external call a transaction waits on before it can be finalized.
#[async_trait]
pub trait ExternalCall: Send + Sync + 'static {
    async fn call(&self, transaction_id: &str) -> Result<(), ExternalCallError>;
}

/// Stands in for the downstream system: waits a fixed latency and succeeds.
#[derive(Debug)]
pub struct SimulatedExternalCall {
    delay: Duration,
    calls: AtomicUsize,
}

impl SimulatedExternalCall {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalCall for SimulatedExternalCall {
    async fn call(&self, transaction_id: &str) -> Result<(), ExternalCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(transaction_id = %transaction_id, delay_ms = self.delay.as_millis() as u64, "Simulating external call");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Runs the delayed terminal transition for newly accepted transactions.
///
/// Each dispatch is an independent tokio task; the number of external calls
/// running at once is capped by a semaphore, and tasks beyond the cap park on
/// it without holding a runtime thread.
#[derive(Clone)]
pub struct DeferredProcessor {
    store: Arc<dyn TransactionStore>,
    external: Arc<dyn ExternalCall>,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

impl DeferredProcessor {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        external: Arc<dyn ExternalCall>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            external,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Schedules processing of `transaction_id` and returns immediately.
    pub fn dispatch(&self, transaction_id: String) {
        let guard = InFlightGuard::new(self.in_flight.clone());
        let processor = self.clone();

        tokio::spawn(async move {
            let _guard = guard;
            processor.run(&transaction_id).await;
        });
    }

    /// Dispatched transactions whose terminal write has not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Processes one transaction to its terminal state.
    ///
    /// A failed external call ends in `FAILED`. A failed store write is logged and
    /// the record stays in `PROCESSING`; there is no retry.
    pub async fn run(&self, transaction_id: &str) {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(transaction_id = %transaction_id, "Processor pool closed; transaction left in PROCESSING");
                return;
            }
        };

        info!(transaction_id = %transaction_id, "Processing transaction");

        let status = match self.external.call(transaction_id).await {
            Ok(()) => TerminalStatus::Processed,
            Err(e) => {
                warn!(transaction_id = %transaction_id, error = %e, "External call failed; marking transaction FAILED");
                TerminalStatus::Failed
            }
        };

        match self.store.transition(transaction_id, status, Utc::now()).await {
            Ok(TransitionOutcome::Applied) => {
                info!(transaction_id = %transaction_id, status = ?status, "Transaction finalized");
            }
            Ok(TransitionOutcome::AlreadyTerminal(current)) => {
                info!(transaction_id = %transaction_id, status = %current, "Transaction already finalized");
            }
            Err(e) => {
                error!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "Terminal transition failed; transaction stuck in PROCESSING"
                );
            }
        }
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
