use std::time::{Duration, Instant};

/// Lifecycle state of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Not currently mid-cycle; waiting for the next tick or trigger.
    Idle,
    /// Presently inside `Worker::execute`.
    Running,
    /// Healthy by cycle count, but hasn't heartbeated within the
    /// supervisor's staleness window. Observed only by the supervisor; a
    /// runner never sets this on itself.
    Stuck,
    /// Recovering from a caught panic, about to loop back around.
    Restarting,
    /// Hasn't produced a successful cycle and is no longer making progress.
    /// Reserved for supervisor-level escalation; the runner itself only
    /// ever reports idle/running/restarting.
    Failed,
    /// Disabled via `Supervisor::set_enabled`; the task is alive but
    /// `execute` is skipped every tick.
    Disabled,
}

/// A point-in-time snapshot of a runner's health, safe to hand to
/// concurrent readers.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub name: String,
    pub state: WorkerState,
    pub last_heartbeat: Instant,
    pub last_run: Option<Instant>,
    pub last_duration: Option<Duration>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub error_count: u64,
    pub restart_count: u64,
    pub total_restarts: u64,
    pub items_processed: u64,
    pub started_at: Instant,
    pub enabled: bool,
    /// The worker's own `Worker::interval()`, carried along so the
    /// supervisor can compute the default staleness window (§4.6:
    /// 3x interval, or a fixed 60s for interval==0 workers) without
    /// reaching back into the runner.
    pub interval: Duration,
}

impl WorkerStatus {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            name: name.into(),
            state: WorkerState::Idle,
            last_heartbeat: now,
            last_run: None,
            last_duration: None,
            last_error: None,
            run_count: 0,
            error_count: 0,
            restart_count: 0,
            total_restarts: 0,
            items_processed: 0,
            started_at: now,
            enabled: true,
            interval,
        }
    }

    /// Whether this runner counts as healthy under `staleness_window`:
    /// idle or running, and heartbeated recently enough.
    pub fn is_healthy(&self, staleness_window: Duration) -> bool {
        matches!(self.state, WorkerState::Idle | WorkerState::Running)
            && self.last_heartbeat.elapsed() <= staleness_window
    }
}

/// The §4.6 default staleness window for a worker with the given
/// `Worker::interval()`: 3x the interval, or a fixed 60s for
/// interval==0 (continuously-running) workers, which have no interval to
/// scale from.
pub fn default_staleness_window(interval: Duration) -> Duration {
    if interval.is_zero() {
        Duration::from_secs(60)
    } else {
        interval * 3
    }
}
