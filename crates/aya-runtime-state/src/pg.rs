use crate::repository::{RuntimeStateEntry, RuntimeStateRepository};
use async_trait::async_trait;
use aya_core::AyaError;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

fn transient(operation: &'static str) -> impl Fn(sqlx::Error) -> AyaError {
    move |e| AyaError::transient_io(operation, e)
}

/// `RuntimeStateRepository` backed by Postgres. Advisory locks need a
/// session-scoped physical connection, not the pool, so held locks keep
/// their checked-out `PoolConnection` alive until `release_lock` runs
/// `pg_advisory_unlock`; if the process dies first, Postgres releases the
/// lock itself when the backend connection closes.
pub struct PgRuntimeState {
    pool: PgPool,
    held_locks: Arc<Mutex<HashMap<i64, PoolConnection<Postgres>>>>,
}

impl PgRuntimeState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            held_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RuntimeStateRepository for PgRuntimeState {
    async fn get(&self, key: &str) -> Result<Option<String>, AyaError> {
        let row = sqlx::query("SELECT value FROM runtime_states WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient("runtime_state.get"))?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AyaError> {
        sqlx::query(
            r#"
            INSERT INTO runtime_states (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(transient("runtime_state.set"))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AyaError> {
        sqlx::query("DELETE FROM runtime_states WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(transient("runtime_state.remove"))?;
        Ok(())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<RuntimeStateEntry>, AyaError> {
        let like_pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query(
            "SELECT key, value, updated_at FROM runtime_states WHERE key LIKE $1 ORDER BY key",
        )
        .bind(like_pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(transient("runtime_state.list_by_prefix"))?;

        Ok(rows
            .into_iter()
            .map(|row| RuntimeStateEntry {
                key: row.get("key"),
                value: row.get("value"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    async fn get_time(&self, key: &str) -> Result<Option<DateTime<Utc>>, AyaError> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|source| AyaError::InvalidTime {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    async fn set_time(&self, key: &str, value: DateTime<Utc>) -> Result<(), AyaError> {
        self.set(key, &value.to_rfc3339()).await
    }

    async fn try_lock(&self, id: i64) -> Result<bool, AyaError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(transient("runtime_state.try_lock.acquire"))?;

        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await
            .map_err(transient("runtime_state.try_lock"))?;

        if acquired {
            self.held_locks.lock().await.insert(id, conn);
        }
        Ok(acquired)
    }

    async fn release_lock(&self, id: i64) -> Result<(), AyaError> {
        let mut held = self.held_locks.lock().await;
        if let Some(mut conn) = held.remove(&id) {
            let _: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await
                .map_err(transient("runtime_state.release_lock"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exercises the prefix-pattern escaping logic without a live database:
    // LIKE metacharacters in a caller-supplied prefix must not turn into
    // wildcards.
    #[test]
    fn prefix_pattern_escapes_like_metacharacters() {
        let prefix = "youtube_sync.100%";
        let escaped = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        assert_eq!(escaped, "youtube\\_sync.100\\%%");
    }
}
