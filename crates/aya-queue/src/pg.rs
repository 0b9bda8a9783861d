use crate::model::{
    QueueItem, QueueStatus, DEFAULT_MAX_RETRIES, DEFAULT_VISIBILITY_TIMEOUT_SECS,
};
use crate::repository::QueueRepository;
use async_trait::async_trait;
use aya_core::AyaError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

fn transient(operation: &'static str) -> impl Fn(sqlx::Error) -> AyaError {
    move |e| AyaError::transient_io(operation, e)
}

fn resolve_max_retries(requested: i32) -> i32 {
    if requested == 0 {
        DEFAULT_MAX_RETRIES
    } else {
        requested
    }
}

fn resolve_visibility_timeout_secs(requested: i32) -> i32 {
    if requested == 0 {
        DEFAULT_VISIBILITY_TIMEOUT_SECS
    } else {
        requested
    }
}

fn row_to_item(row: sqlx::postgres::PgRow) -> Result<QueueItem, AyaError> {
    let status_raw: String = row.get("status");
    let status = QueueStatus::from_str(&status_raw).ok_or_else(|| {
        AyaError::Invariant(format!("unrecognized queue item status {status_raw}"))
    })?;

    Ok(QueueItem {
        id: row.get("id"),
        item_type: row.get("item_type"),
        payload: row.get("payload"),
        status,
        retry_count: row.get("retry_count"),
        max_retries: row.get("max_retries"),
        visibility_timeout_secs: row.get("visibility_timeout_secs"),
        visible_at: row.get("visible_at"),
        worker_id: row.get("worker_id"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        failed_at: row.get("failed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        error_message: row.get("error_message"),
    })
}

/// `QueueRepository` backed by Postgres. `claim_next` uses a
/// `FOR UPDATE SKIP LOCKED` CTE so many workers (in-process or across
/// replicas) can poll concurrently without contending on the same row.
/// `visible_at` is reused as the lease deadline once an item is claimed, so
/// the claim predicate itself picks up both not-yet-visible pending items
/// and `processing` items whose lease has expired, with no separate
/// janitor sweep needed.
pub struct PgQueue {
    pool: PgPool,
}

impl PgQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QueueRepository for PgQueue {
    async fn enqueue(
        &self,
        item_type: &str,
        payload: Value,
        max_retries: i32,
        visibility_timeout_secs: i32,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<String, AyaError> {
        let id = Uuid::now_v7().to_string();
        let max_retries = resolve_max_retries(max_retries);
        let visibility_timeout_secs = resolve_visibility_timeout_secs(visibility_timeout_secs);
        let visible_at = scheduled_at.unwrap_or_else(Utc::now);

        sqlx::query(
            r#"
            INSERT INTO queue_items
                (id, item_type, payload, status, retry_count, max_retries,
                 visibility_timeout_secs, visible_at, created_at, updated_at)
            VALUES
                ($1, $2, $3, 'pending', 0, $4, $5, $6, NOW(), NOW())
            "#,
        )
        .bind(&id)
        .bind(item_type)
        .bind(payload)
        .bind(max_retries)
        .bind(visibility_timeout_secs)
        .bind(visible_at)
        .execute(&self.pool)
        .await
        .map_err(transient("queue.enqueue"))?;

        Ok(id)
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<QueueItem>, AyaError> {
        let row = sqlx::query(
            r#"
            WITH claimable AS (
                SELECT id
                FROM queue_items
                WHERE (status = 'pending' OR status = 'processing') AND visible_at <= NOW()
                ORDER BY visible_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE queue_items
            SET status = 'processing',
                worker_id = $1,
                started_at = NOW(),
                visible_at = NOW() + (visibility_timeout_secs * INTERVAL '1 second'),
                updated_at = NOW()
            WHERE id IN (SELECT id FROM claimable)
            RETURNING *
            "#,
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(transient("queue.claim_next"))?;

        row.map(row_to_item).transpose()
    }

    async fn complete(&self, id: &str, worker_id: &str) -> Result<(), AyaError> {
        sqlx::query(
            r#"
            UPDATE queue_items
            SET status = 'completed', completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND worker_id = $2 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(transient("queue.complete"))?;
        Ok(())
    }

    async fn fail(
        &self,
        id: &str,
        worker_id: &str,
        error_message: &str,
        backoff_seconds: i64,
    ) -> Result<(), AyaError> {
        sqlx::query(
            r#"
            UPDATE queue_items
            SET
                retry_count = CASE WHEN retry_count + 1 > max_retries THEN retry_count ELSE retry_count + 1 END,
                status = CASE WHEN retry_count + 1 > max_retries THEN 'dead' ELSE 'pending' END,
                failed_at = CASE WHEN retry_count + 1 > max_retries THEN NOW() ELSE failed_at END,
                worker_id = CASE WHEN retry_count + 1 > max_retries THEN worker_id ELSE NULL END,
                started_at = CASE WHEN retry_count + 1 > max_retries THEN started_at ELSE NULL END,
                visible_at = CASE
                    WHEN retry_count + 1 > max_retries THEN visible_at
                    ELSE NOW() + ($3 * INTERVAL '1 second')
                END,
                error_message = $4,
                updated_at = NOW()
            WHERE id = $1 AND worker_id = $2 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(worker_id)
        .bind(backoff_seconds)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(transient("queue.fail"))?;
        Ok(())
    }

    async fn list_by_type(&self, item_type: &str, limit: i64) -> Result<Vec<QueueItem>, AyaError> {
        let rows = sqlx::query(
            "SELECT * FROM queue_items WHERE item_type = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(item_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(transient("queue.list_by_type"))?;

        rows.into_iter().map(row_to_item).collect()
    }
}
