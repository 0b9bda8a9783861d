use aya_core::AyaError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One row of runtime state: a dotted-namespace key, its caller-encoded
/// value, and when it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStateEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Key/value store plus session-scoped advisory locks.
///
/// `Set` is an atomic per-key upsert; a successful `Set` is visible to a
/// subsequent `Get` in the same session (read-your-writes). `TryLock` never
/// blocks: it either acquires the lock and returns `true`, or returns
/// `false` immediately.
#[async_trait]
pub trait RuntimeStateRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AyaError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AyaError>;
    async fn remove(&self, key: &str) -> Result<(), AyaError>;
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<RuntimeStateEntry>, AyaError>;

    /// Convenience wrapper over `get`/`set` that encodes/decodes RFC3339Nano
    /// instants. Fails with `AyaError::InvalidTime` if the stored value
    /// doesn't parse.
    async fn get_time(&self, key: &str) -> Result<Option<DateTime<Utc>>, AyaError>;
    async fn set_time(&self, key: &str, value: DateTime<Utc>) -> Result<(), AyaError>;

    /// Non-blocking: acquires a session-scoped advisory lock identified by
    /// `id`, or returns `false` if another session already holds it.
    async fn try_lock(&self, id: i64) -> Result<bool, AyaError>;
    /// Releases a lock previously acquired by `try_lock`. A no-op if this
    /// session doesn't hold it.
    async fn release_lock(&self, id: i64) -> Result<(), AyaError>;
}
