use aya_queue::QueueRepository;
use aya_retry::compute_backoff;
use aya_workers::{BoxError, HandlerRegistry, Worker, WorkerContext};
use std::sync::Arc;
use std::time::Duration;

const MIN_FAIL_BACKOFF_SECS: i64 = 1;
const MAX_FAIL_BACKOFF_SECS: i64 = 300;

/// Drains the durable queue forever.
/// `interval() == Duration::ZERO`: the worker runtime re-invokes `execute`
/// immediately with no gap, so each call here handles exactly one claimed
/// item (or sleeps briefly if the queue was empty, to avoid a hot spin).
pub struct QueueConsumerWorker {
    name: String,
    worker_id: String,
    empty_poll_delay: Duration,
    queue: Arc<dyn QueueRepository>,
    handlers: Arc<HandlerRegistry>,
}

impl QueueConsumerWorker {
    pub fn new(
        name: impl Into<String>,
        worker_id: impl Into<String>,
        empty_poll_delay: Duration,
        queue: Arc<dyn QueueRepository>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            worker_id: worker_id.into(),
            empty_poll_delay,
            queue,
            handlers,
        }
    }
}

#[async_trait::async_trait]
impl Worker for QueueConsumerWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        Duration::ZERO
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<(), BoxError> {
        if ctx.is_cancelled() {
            return Ok(());
        }

        let Some(item) = self.queue.claim_next(&self.worker_id).await? else {
            tokio::time::sleep(self.empty_poll_delay).await;
            return Ok(());
        };

        // From here on, finish the claimed item rather than abandoning it
        // mid-flight even if `ctx` is now cancelled; its lease will simply
        // expire and another worker will pick it back up if we're killed
        // before this completes.
        let handler = self.handlers.get(&item.item_type);
        let outcome = match handler {
            Some(handler) => handler.handle(&item).await,
            None => Err(Box::new(aya_core::AyaError::HandlerNotRegistered {
                item_type: item.item_type.clone(),
            }) as BoxError),
        };

        match outcome {
            Ok(()) => {
                self.queue.complete(&item.id, &self.worker_id).await?;
                ctx.record_items_processed(1);
            }
            Err(err) => {
                let backoff = compute_backoff(
                    item.retry_count as usize,
                    Duration::from_secs(1),
                    2.0,
                    0.1,
                    Duration::from_secs(MAX_FAIL_BACKOFF_SECS as u64),
                )
                .as_secs()
                .max(MIN_FAIL_BACKOFF_SECS as u64) as i64;

                self.queue
                    .fail(&item.id, &self.worker_id, &err.to_string(), backoff)
                    .await?;
            }
        }

        Ok(())
    }
}
