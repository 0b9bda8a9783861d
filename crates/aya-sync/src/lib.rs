//! Concrete periodic sync workers: full-sync, incremental-sync,
//! resource-sync, queue-consumer, and polling-adapter, all built on
//! [`aya_workers::Worker`], [`aya_queue::QueueRepository`],
//! [`aya_runtime_state::RuntimeStateRepository`], and
//! [`aya_sites::SiteProvider`].
//!
//! All five share the same step sequence: acquire a per-worker
//! advisory lock (single-leader across replicas), read cursor/last-run from
//! runtime-state, enumerate external work, upsert + enqueue post-processing
//! per item, advance the cursor, and release the lock on every exit path.
//! [`leader::with_leader_lock`] is the shared implementation of that
//! acquire/release discipline.

mod full_sync;
mod import_repository;
mod incremental_sync;
mod leader;
mod lock;
mod polling;
mod queue_consumer;
mod resource_sync;

pub use full_sync::FullSyncWorker;
pub use import_repository::ImportRepository;
pub use incremental_sync::IncrementalSyncWorker;
pub use leader::with_leader_lock;
pub use lock::lock_id_for;
pub use polling::PollingAdapterWorker;
pub use queue_consumer::QueueConsumerWorker;
pub use resource_sync::ResourceSyncWorker;
