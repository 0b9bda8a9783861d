//! The composition root: wires workers, the supervisor, runtime
//! state, and shutdown signaling into one running process. Shaped as a
//! facade crate re-exporting its component crates behind one surface,
//! plus `Process`, which provides an actual wiring point (enable/disable
//! persistence, health aggregation) rather than just re-exporting.

mod health;
mod process;

pub use health::{build_report, HealthReport, WorkerHealth};
pub use process::Process;

pub use aya_queue::{PgQueue, QueueItem, QueueRepository, QueueStatus};
pub use aya_runtime_state::{PgRuntimeState, RuntimeStateEntry, RuntimeStateRepository};
pub use aya_shutdown::ShutdownGuard;
pub use aya_workers::{HandlerRegistry, HealthStatus, QueueHandler, Runner, Summary, Supervisor, Worker, WorkerContext, WorkerState, WorkerStatus};
