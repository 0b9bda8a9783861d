use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The context handed to `Worker::execute` each cycle.
///
/// Wraps the root cancellation token; a worker whose cycle needs its own
/// deadline derives a child `tokio::time::timeout` around its own work.
/// Per-cycle timeouts are each worker's own responsibility.
#[derive(Clone)]
pub struct WorkerContext {
    cancellation: CancellationToken,
    items_processed: Arc<AtomicU64>,
}

impl WorkerContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            items_processed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn with_counter(cancellation: CancellationToken, items_processed: Arc<AtomicU64>) -> Self {
        Self {
            cancellation,
            items_processed,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Lets a worker that handles more than one logical item per cycle
    /// (the queue consumer, a full-sync worker enumerating many items)
    /// report how many it processed, surfaced through the supervisor's
    /// `/health` counters.
    pub fn record_items_processed(&self, count: u64) {
        self.items_processed.fetch_add(count, Ordering::Relaxed);
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One periodic (or continuously-running) unit of background work.
/// `interval() == Duration::ZERO` means "re-execute immediately with no
/// gap", used by the queue-consumer worker.
#[async_trait::async_trait]
pub trait Worker: Send + Sync {
    /// Stable identifier; doubles as the runtime-state namespace key.
    fn name(&self) -> &str;

    fn interval(&self) -> std::time::Duration;

    async fn execute(&self, ctx: &WorkerContext) -> Result<(), BoxError>;
}
