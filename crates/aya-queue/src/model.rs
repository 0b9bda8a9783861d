use chrono::{DateTime, Utc};
use serde_json::Value;

/// Lifecycle status of a [`QueueItem`].
///
/// `Failed` is part of the schema's status domain but the state machine
/// never assigns it directly: a retryable failure goes back to `Pending`
/// and an exhausted one goes to `Dead`. Stored as plain `TEXT`, not a
/// native Postgres enum type, so adding a status never requires a migration
/// that alters a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Dead,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Dead => "dead",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "dead" => Some(Self::Dead),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of deferred work.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: String,
    pub item_type: String,
    pub payload: Value,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub visibility_timeout_secs: i32,
    pub visible_at: DateTime<Utc>,
    pub worker_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

pub const DEFAULT_MAX_RETRIES: i32 = 3;
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: i32 = 300;
