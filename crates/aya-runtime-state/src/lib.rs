//! Key/value runtime state plus session-scoped advisory locks.
//!
//! Backs worker last-run markers, per-source sync cursors, operator-toggled
//! enable flags, and the single-leader coordination used by periodic sync
//! workers across replicas.

mod pg;
mod repository;

pub use pg::PgRuntimeState;
pub use repository::{RuntimeStateEntry, RuntimeStateRepository};
