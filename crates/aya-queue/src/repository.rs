use crate::model::QueueItem;
use async_trait::async_trait;
use aya_core::AyaError;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Durable, claimable work queue.
///
/// `claim_next` must be safe under concurrent callers across processes: at
/// most one caller ever observes a given item as newly-claimed. `complete`
/// and `fail` are worker-id guarded so a worker whose lease already expired
/// (and whose item was re-claimed by someone else) can't clobber the new
/// holder's work; a guard mismatch is a silent no-op, not an error.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Inserts a new item. `max_retries=0` and `visibility_timeout_secs=0`
    /// fall back to their defaults (3 and 300s respectively).
    async fn enqueue(
        &self,
        item_type: &str,
        payload: Value,
        max_retries: i32,
        visibility_timeout_secs: i32,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<String, AyaError>;

    /// Atomically claims the oldest eligible pending item for `worker_id`,
    /// or returns `None` if nothing is eligible.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<QueueItem>, AyaError>;

    /// Transitions `processing -> completed`, guarded by `worker_id`.
    async fn complete(&self, id: &str, worker_id: &str) -> Result<(), AyaError>;

    /// Records a failure, guarded by `worker_id`. Dead-letters the item if
    /// `retry_count + 1 > max_retries`; otherwise reschedules it
    /// `backoff_seconds` in the future. The caller computes the backoff
    /// (see `aya_retry::compute_backoff`).
    async fn fail(
        &self,
        id: &str,
        worker_id: &str,
        error_message: &str,
        backoff_seconds: i64,
    ) -> Result<(), AyaError>;

    /// Operator inspection: items of a given type, most recent first.
    async fn list_by_type(&self, item_type: &str, limit: i64) -> Result<Vec<QueueItem>, AyaError>;
}
