use crate::status::{WorkerState, WorkerStatus};
use crate::worker::{Worker, WorkerContext};
use aya_core::AyaError;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Drives one [`Worker`]'s tick loop as an independent task.
///
/// Status bookkeeping uses a plain `std::sync::Mutex`, not a `tokio::sync`
/// one: critical sections are O(1) field updates with no `.await` inside
/// the lock, so a plain mutex is all runner status ever needs.
pub struct Runner {
    worker: Arc<dyn Worker>,
    status: Mutex<WorkerStatus>,
    enabled: AtomicBool,
    trigger_tx: mpsc::Sender<()>,
    trigger_rx: Mutex<Option<mpsc::Receiver<()>>>,
    items_processed: Arc<AtomicU64>,
}

impl Runner {
    pub fn new(worker: Arc<dyn Worker>) -> Arc<Self> {
        let name = worker.name().to_string();
        let interval = worker.interval();
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        Arc::new(Self {
            worker,
            status: Mutex::new(WorkerStatus::new(name, interval)),
            enabled: AtomicBool::new(true),
            trigger_tx,
            trigger_rx: Mutex::new(Some(trigger_rx)),
            items_processed: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn name(&self) -> String {
        self.status.lock().unwrap().name.clone()
    }

    /// The underlying worker's `Worker::interval()`, also carried on
    /// `WorkerStatus` for the supervisor's default staleness window.
    pub fn interval(&self) -> Duration {
        self.worker.interval()
    }

    pub fn status(&self) -> WorkerStatus {
        let mut status = self.status.lock().unwrap().clone();
        status.items_processed = self.items_processed.load(Ordering::Relaxed);
        status
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        let mut status = self.status.lock().unwrap();
        status.enabled = enabled;
        if !enabled {
            status.state = WorkerState::Disabled;
        } else if matches!(status.state, WorkerState::Disabled) {
            status.state = WorkerState::Idle;
        }
    }

    /// Forces an out-of-band cycle. The channel has capacity 1: a trigger
    /// that arrives while one is already pending is silently dropped
    /// (coalesced).
    pub fn trigger(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Spawns the tick loop on the current Tokio runtime and returns the
    /// join handle. `cancellation` is the root shutdown token; this method
    /// can only be called once per `Runner` (it consumes the trigger
    /// receiver).
    pub fn spawn(self: &Arc<Self>, cancellation: CancellationToken) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        let mut trigger_rx = this
            .trigger_rx
            .lock()
            .unwrap()
            .take()
            .expect("Runner::spawn called more than once");

        tokio::spawn(async move {
            let ctx = WorkerContext::with_counter(cancellation.clone(), Arc::clone(&this.items_processed));
            {
                let mut status = this.status.lock().unwrap();
                status.started_at = Instant::now();
            }

            let interval = this.worker.interval();
            let mut ticker = if interval.is_zero() {
                None
            } else {
                Some(tokio::time::interval(interval))
            };

            loop {
                if cancellation.is_cancelled() {
                    break;
                }

                if this.is_enabled() {
                    this.run_one_cycle(&ctx).await;
                } else {
                    this.heartbeat_only();
                }

                match &mut ticker {
                    // interval()==0: loop back around immediately. Drain
                    // any trigger that arrived mid-cycle so it doesn't
                    // carry over as a spurious extra cycle later.
                    None => {
                        let _ = trigger_rx.try_recv();
                    }
                    Some(t) => {
                        tokio::select! {
                            _ = cancellation.cancelled() => break,
                            _ = t.tick() => {}
                            _ = trigger_rx.recv() => {}
                        }
                    }
                }
            }
        })
    }

    fn heartbeat_only(&self) {
        let mut status = self.status.lock().unwrap();
        status.last_heartbeat = Instant::now();
    }

    async fn run_one_cycle(&self, ctx: &WorkerContext) {
        {
            let mut status = self.status.lock().unwrap();
            status.state = WorkerState::Running;
            status.last_heartbeat = Instant::now();
        }

        let start = Instant::now();
        let worker = Arc::clone(&self.worker);
        let ctx_clone = ctx.clone();
        let result = AssertUnwindSafe(worker.execute(&ctx_clone))
            .catch_unwind()
            .await;

        let duration = start.elapsed();
        let mut status = self.status.lock().unwrap();
        status.last_run = Some(Instant::now());
        status.last_duration = Some(duration);
        status.last_heartbeat = Instant::now();
        status.run_count += 1;

        match result {
            Ok(Ok(())) => {
                status.last_error = None;
                status.state = if status.enabled {
                    WorkerState::Idle
                } else {
                    WorkerState::Disabled
                };
            }
            Ok(Err(err)) => {
                status.error_count += 1;
                status.last_error = Some(err.to_string());
                status.state = if status.enabled {
                    WorkerState::Idle
                } else {
                    WorkerState::Disabled
                };
            }
            Err(panic_payload) => {
                let message = panic_message(panic_payload.as_ref());
                let worker_panicked = AyaError::WorkerPanicked {
                    worker: status.name.clone(),
                    message: message.clone(),
                };
                status.error_count += 1;
                status.restart_count += 1;
                status.total_restarts += 1;
                status.last_error = Some(worker_panicked.to_string());
                status.state = WorkerState::Restarting;

                #[cfg(feature = "tracing")]
                tracing::error!(worker = %status.name, panic_message = %message, "worker cycle panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Adapts `catch_unwind` to an async future the way
/// `aya_core::events::EventListeners::emit` adapts it for synchronous
/// listener calls: the future itself can't be caught mid-poll, so this
/// drives it to completion and catches only if `execute` panics inside a
/// poll.
trait CatchUnwindFuture: std::future::Future + Sized {
    fn catch_unwind(self) -> CatchUnwind<Self> {
        CatchUnwind { inner: Some(self) }
    }
}

impl<F: std::future::Future> CatchUnwindFuture for F {}

struct CatchUnwind<F> {
    inner: Option<F>,
}

impl<F> std::future::Future for CatchUnwind<F>
where
    F: std::future::Future,
{
    type Output = std::thread::Result<F::Output>;

    fn poll(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        // SAFETY: `inner` is only ever moved out of in this poll and never
        // accessed again after completion; the pin projection is into a
        // field we never move once polling has started.
        let inner = unsafe { self.as_mut().get_unchecked_mut() };
        let fut = inner
            .inner
            .as_mut()
            .expect("CatchUnwind polled after completion");
        let fut = unsafe { std::pin::Pin::new_unchecked(fut) };

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| fut.poll(cx)));
        match result {
            Ok(std::task::Poll::Ready(output)) => {
                inner.inner = None;
                std::task::Poll::Ready(Ok(output))
            }
            Ok(std::task::Poll::Pending) => std::task::Poll::Pending,
            Err(panic_payload) => {
                inner.inner = None;
                std::task::Poll::Ready(Err(panic_payload))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::BoxError;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
    use std::time::Duration as StdDuration;

    struct PanickingWorker;

    #[async_trait::async_trait]
    impl Worker for PanickingWorker {
        fn name(&self) -> &str {
            "panicking"
        }
        fn interval(&self) -> StdDuration {
            StdDuration::from_millis(5)
        }
        async fn execute(&self, _ctx: &WorkerContext) -> Result<(), BoxError> {
            panic!("boom");
        }
    }

    struct CountingWorker {
        count: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl Worker for CountingWorker {
        fn name(&self) -> &str {
            "counting"
        }
        fn interval(&self) -> StdDuration {
            StdDuration::from_millis(5)
        }
        async fn execute(&self, _ctx: &WorkerContext) -> Result<(), BoxError> {
            self.count.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn panicking_worker_does_not_crash_and_keeps_ticking() {
        let runner = Runner::new(Arc::new(PanickingWorker));
        let token = CancellationToken::new();
        let handle = runner.spawn(token.clone());

        tokio::time::sleep(StdDuration::from_millis(60)).await;
        token.cancel();
        let _ = handle.await;

        let status = runner.status();
        assert!(status.error_count >= 2);
        assert!(status.last_error.as_deref().unwrap_or("").contains("boom"));
    }

    #[tokio::test]
    async fn two_workers_run_independently() {
        let count = Arc::new(AtomicU32::new(0));
        let panicking = Runner::new(Arc::new(PanickingWorker));
        let counting = Runner::new(Arc::new(CountingWorker { count: count.clone() }));

        let token = CancellationToken::new();
        let h1 = panicking.spawn(token.clone());
        let h2 = counting.spawn(token.clone());

        tokio::time::sleep(StdDuration::from_millis(60)).await;
        token.cancel();
        let _ = tokio::join!(h1, h2);

        assert!(count.load(AtomicOrdering::SeqCst) >= 2);
        assert_eq!(counting.status().error_count, 0);
    }

    #[tokio::test]
    async fn disabled_runner_skips_execute() {
        let count = Arc::new(AtomicU32::new(0));
        let runner = Runner::new(Arc::new(CountingWorker { count: count.clone() }));
        runner.set_enabled(false);

        let token = CancellationToken::new();
        let handle = runner.spawn(token.clone());
        tokio::time::sleep(StdDuration::from_millis(40)).await;
        token.cancel();
        let _ = handle.await;

        assert_eq!(count.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn trigger_forces_an_out_of_band_cycle() {
        let count = Arc::new(AtomicU32::new(0));
        let runner = Runner::new(Arc::new(CountingWorker { count: count.clone() }));
        let token = CancellationToken::new();
        let handle = runner.spawn(token.clone());

        runner.trigger();
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        token.cancel();
        let _ = handle.await;

        assert!(count.load(AtomicOrdering::SeqCst) >= 1);
    }

    struct ItemReportingWorker;

    #[async_trait::async_trait]
    impl Worker for ItemReportingWorker {
        fn name(&self) -> &str {
            "item-reporting"
        }
        fn interval(&self) -> StdDuration {
            StdDuration::from_millis(5)
        }
        async fn execute(&self, ctx: &WorkerContext) -> Result<(), BoxError> {
            ctx.record_items_processed(3);
            Ok(())
        }
    }

    #[tokio::test]
    async fn items_processed_accumulates_across_cycles() {
        let runner = Runner::new(Arc::new(ItemReportingWorker));
        let token = CancellationToken::new();
        let handle = runner.spawn(token.clone());

        tokio::time::sleep(StdDuration::from_millis(30)).await;
        token.cancel();
        let _ = handle.await;

        assert!(runner.status().items_processed >= 3);
    }
}
