use aya_workers::{HealthStatus, Summary, WorkerState, WorkerStatus};
use serde::Serialize;

/// The `/health` payload the core exposes to the routing layer:
/// overall status, per-worker state, and counters an operator can drill
/// into from an admin UI.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub total: usize,
    pub healthy: usize,
    pub stuck: usize,
    pub restarting: usize,
    pub failed: usize,
    pub workers: Vec<WorkerHealth>,
}

#[derive(Debug, Serialize)]
pub struct WorkerHealth {
    pub name: String,
    pub state: &'static str,
    pub run_count: u64,
    pub error_count: u64,
    pub restart_count: u64,
    pub total_restarts: u64,
    pub items_processed: u64,
    pub last_error: Option<String>,
    pub last_duration_ms: Option<u128>,
    pub enabled: bool,
}

impl From<&WorkerStatus> for WorkerHealth {
    fn from(status: &WorkerStatus) -> Self {
        Self {
            name: status.name.clone(),
            state: state_label(status.state),
            run_count: status.run_count,
            error_count: status.error_count,
            restart_count: status.restart_count,
            total_restarts: status.total_restarts,
            items_processed: status.items_processed,
            last_error: status.last_error.clone(),
            last_duration_ms: status.last_duration.map(|d| d.as_millis()),
            enabled: status.enabled,
        }
    }
}

fn state_label(state: WorkerState) -> &'static str {
    match state {
        WorkerState::Idle => "idle",
        WorkerState::Running => "running",
        WorkerState::Stuck => "stuck",
        WorkerState::Restarting => "restarting",
        WorkerState::Failed => "failed",
        WorkerState::Disabled => "disabled",
    }
}

pub fn build_report(summary: &Summary, workers: &[WorkerStatus]) -> HealthReport {
    HealthReport {
        status: match summary.status {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        },
        total: summary.total,
        healthy: summary.healthy,
        stuck: summary.stuck,
        restarting: summary.restarting,
        failed: summary.failed,
        workers: workers.iter().map(WorkerHealth::from).collect(),
    }
}
