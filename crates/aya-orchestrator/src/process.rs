use crate::health::{build_report, HealthReport};
use aya_core::AyaError;
use aya_runtime_state::RuntimeStateRepository;
use aya_shutdown::ShutdownGuard;
use aya_workers::{Runner, Supervisor, Worker};
use std::sync::Arc;
use std::time::Duration;

/// The composition root: receives a root shutdown context, wires
/// each enabled worker into a [`Runner`], registers every runner in the
/// [`Supervisor`], and starts each as an independent task.
///
/// `Process` itself holds no cyclic references: workers depend on
/// adapters/queues/state, the supervisor is only ever observed (never calls
/// back into a worker).
pub struct Process {
    supervisor: Arc<Supervisor>,
    runtime_state: Arc<dyn RuntimeStateRepository>,
    /// `advisory_lock.staleness_window` config override. `None` means every
    /// runner uses the §4.6 default (3x its own interval, or 60s for
    /// interval==0 workers) computed by `Supervisor::summary`.
    staleness_window_override: Option<Duration>,
}

impl Process {
    pub fn new(
        runtime_state: Arc<dyn RuntimeStateRepository>,
        staleness_window_override: Option<Duration>,
    ) -> Self {
        Self {
            supervisor: Arc::new(Supervisor::new()),
            runtime_state,
            staleness_window_override,
        }
    }

    pub fn supervisor(&self) -> Arc<Supervisor> {
        Arc::clone(&self.supervisor)
    }

    /// Wraps `worker` in a [`Runner`], registers it in the supervisor, and
    /// spawns its tick loop cancelled by `shutdown`'s root token. The
    /// returned handle is tracked by `shutdown` so graceful shutdown waits
    /// for it.
    pub fn spawn_worker(&self, worker: Arc<dyn Worker>, shutdown: &mut ShutdownGuard) -> Arc<Runner> {
        let runner = Runner::new(worker);
        self.supervisor.register(Arc::clone(&runner));
        let handle = runner.spawn(shutdown.cancellation_token());
        shutdown.track(handle);
        runner
    }

    pub fn health_report(&self) -> HealthReport {
        let summary = match self.staleness_window_override {
            Some(window) => self.supervisor.summary_with(|_status| window),
            None => self.supervisor.summary(),
        };
        let workers = self.supervisor.list();
        build_report(&summary, &workers)
    }

    /// Admin enable/disable action: flips the runner's
    /// in-memory flag and persists the toggle as `worker.{name}.is_enabled`
    /// so a future restart picks up the operator's choice. Returns `false`
    /// if no runner by that name is registered.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool, AyaError> {
        if !self.supervisor.set_enabled(name, enabled) {
            return Ok(false);
        }
        self.runtime_state
            .set(&format!("worker.{name}.is_enabled"), if enabled { "true" } else { "false" })
            .await?;
        Ok(true)
    }

    /// Admin trigger-now action.
    pub fn trigger(&self, name: &str) -> bool {
        self.supervisor.trigger(name)
    }

    /// Reapplies persisted `worker.{name}.is_enabled` toggles at startup,
    /// before any runner's first cycle, so an operator's prior choice
    /// survives a restart.
    pub async fn restore_enabled_flags(&self, worker_names: &[&str]) -> Result<(), AyaError> {
        for name in worker_names {
            let key = format!("worker.{name}.is_enabled");
            if let Some(value) = self.runtime_state.get(&key).await? {
                self.supervisor.set_enabled(name, value == "true");
            }
        }
        Ok(())
    }
}
