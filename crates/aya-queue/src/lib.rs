//! Durable, claimable work queue.
//!
//! Items are enqueued with a type and JSON payload, claimed with
//! `FOR UPDATE SKIP LOCKED` leasing semantics, and either completed or
//! failed (with exponential backoff, dead-lettering once `max_retries` is
//! exhausted). All mutations are worker-id guarded so a lease that expired
//! mid-flight can't clobber whoever re-claimed the item.

mod model;
mod pg;
mod repository;

pub use model::{QueueItem, QueueStatus, DEFAULT_MAX_RETRIES, DEFAULT_VISIBILITY_TIMEOUT_SECS};
pub use pg::PgQueue;
pub use repository::QueueRepository;
