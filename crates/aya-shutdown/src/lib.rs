//! Shutdown orchestrator: wait for a termination signal, cancel the root
//! context, then join every spawned task with a graceful timeout.
//!
//! Grounded on the signal-handling task and `TaskTracker`-close pattern in
//! `hook0 output-worker::main`, generalized from a `TaskTracker` (which only
//! tracks in-flight request tasks) to a `CancellationToken` + `JoinSet`
//! combo: the orchestrator core needs to hand every runner a cancellable
//! context up front, not just track work started after shutdown begins.

use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Owns the root cancellation token and the set of spawned tasks it
/// cancels at shutdown.
pub struct ShutdownGuard {
    cancellation: CancellationToken,
    tasks: JoinSet<()>,
    graceful_timeout: Duration,
}

impl ShutdownGuard {
    pub fn new(graceful_timeout: Duration) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            tasks: JoinSet::new(),
            graceful_timeout,
        }
    }

    /// The token handed to every runner/worker at wiring time; cancelling
    /// it is the only shutdown signal they ever see.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Tracks a task's join handle so `wait_for_shutdown` can wait on it.
    pub fn track(&mut self, handle: tokio::task::JoinHandle<()>) {
        self.tasks.spawn(async move {
            let _ = handle.await;
        });
    }

    /// Waits for SIGINT or SIGTERM, cancels the root context,
    /// then waits for every tracked task to return, up to
    /// `graceful_timeout`. On timeout, abandons the wait and returns so the
    /// process can exit; it does not forcibly kill the still-running tasks.
    pub async fn wait_for_shutdown(mut self) {
        wait_for_termination_signal().await;

        #[cfg(feature = "tracing")]
        tracing::info!("shutdown signal received, cancelling root context");
        self.cancellation.cancel();

        self.join_with_timeout().await;
    }

    /// Test/caller-driven shutdown that skips waiting on an OS signal:
    /// cancels immediately and joins with the same timeout discipline.
    pub async fn shutdown_now(mut self) {
        self.cancellation.cancel();
        self.join_with_timeout().await;
    }

    async fn join_with_timeout(&mut self) {
        let join_all = async {
            while self.tasks.join_next().await.is_some() {}
        };

        if tokio::time::timeout(self.graceful_timeout, join_all)
            .await
            .is_err()
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                remaining = self.tasks.len(),
                "graceful shutdown timeout elapsed, abandoning wait"
            );
        }
    }
}

#[cfg(unix)]
async fn wait_for_termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
