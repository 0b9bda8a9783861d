use crate::runner::Runner;
use crate::status::{default_staleness_window, WorkerState, WorkerStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Aggregate health across every registered runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub total: usize,
    pub healthy: usize,
    pub stuck: usize,
    pub restarting: usize,
    pub failed: usize,
    pub is_healthy: bool,
    pub status: HealthStatus,
}

/// The process-wide registry of runners, the data source for
/// the `/health` endpoint and for admin enable/disable/trigger-now actions.
///
/// Read-mostly: registration happens during wiring, lookups happen on every
/// health check, so the map sits behind an `RwLock` rather than a plain
/// `Mutex`.
#[derive(Default)]
pub struct Supervisor {
    runners: RwLock<HashMap<String, Arc<Runner>>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent insert; a later registration under the same name replaces
    /// the earlier runner (used when a worker is restarted under a fresh
    /// `Runner`).
    pub fn register(&self, runner: Arc<Runner>) {
        let name = runner.name();
        self.runners.write().unwrap().insert(name, runner);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Runner>> {
        self.runners.read().unwrap().get(name).cloned()
    }

    pub fn list(&self) -> Vec<WorkerStatus> {
        self.runners
            .read()
            .unwrap()
            .values()
            .map(|r| r.status())
            .collect()
    }

    pub fn trigger(&self, name: &str) -> bool {
        match self.get(name) {
            Some(runner) => {
                runner.trigger();
                true
            }
            None => false,
        }
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.get(name) {
            Some(runner) => {
                runner.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Applies the §4.6 default staleness window per runner: 3x that
    /// worker's own `interval()`, or a fixed 60s for interval==0 workers.
    /// Use `summary_with` to override the window (e.g. from the
    /// `advisory_lock.staleness_window` config option) instead of the
    /// per-worker default.
    pub fn summary(&self) -> Summary {
        self.summary_with(|status| default_staleness_window(status.interval))
    }

    /// Same as `summary`, but `staleness_window_for` computes the window
    /// from each runner's own status (so callers can override the §4.6
    /// default uniformly or per-worker).
    pub fn summary_with(&self, staleness_window_for: impl Fn(&WorkerStatus) -> Duration) -> Summary {
        let runners = self.runners.read().unwrap();
        let total = runners.len();
        let mut healthy = 0;
        let mut stuck = 0;
        let mut restarting = 0;
        let mut failed = 0;

        for runner in runners.values() {
            let status = runner.status();
            let window = staleness_window_for(&status);
            match status.state {
                WorkerState::Failed => failed += 1,
                WorkerState::Restarting => restarting += 1,
                WorkerState::Disabled => {}
                _ if !status.is_healthy(window) => stuck += 1,
                _ => healthy += 1,
            }
        }

        let is_healthy = failed == 0 && stuck == 0;
        let status = if failed > 0 {
            HealthStatus::Unhealthy
        } else if stuck > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Summary {
            total,
            healthy,
            stuck,
            restarting,
            failed,
            is_healthy,
            status,
        }
    }
}
