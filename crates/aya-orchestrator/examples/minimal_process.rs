//! Wires a queue consumer and a full-sync worker into one process against a
//! local Postgres instance. Run with `DATABASE_URL` pointed at a database
//! that already has the `aya-queue` and `aya-runtime-state` migrations
//! applied.

use aya_core::AyaError;
use aya_http::{HttpClientConfig, ResilientHttpClient};
use aya_orchestrator::{BoxError, HandlerRegistry, Process, ShutdownGuard};
use aya_queue::{PgQueue, QueueItem};
use aya_runtime_state::PgRuntimeState;
use aya_sites::{ImportItem, JsonFeedProvider};
use aya_sync::{FullSyncWorker, ImportRepository, QueueConsumerWorker};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Stand-in for the host application's domain repository: a real
/// deployment binds this to the `profiles`/`stories` tables instead.
struct LoggingImportRepository;

#[async_trait::async_trait]
impl ImportRepository for LoggingImportRepository {
    async fn upsert_import_item(&self, source: &str, item: &ImportItem) -> Result<(), AyaError> {
        tracing::info!(source, remote_id = %item.remote_id, "upserted import item");
        Ok(())
    }

    async fn mark_absent_as_deleted(&self, source: &str, still_present: &[String]) -> Result<(), AyaError> {
        tracing::info!(source, kept = still_present.len(), "tombstoned absent items");
        Ok(())
    }

    async fn list_known_remote_ids(&self, _source: &str) -> Result<Vec<String>, AyaError> {
        Ok(vec![])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgresql:///aya".to_string());
    let pool = PgPoolOptions::new().max_connections(10).connect(&database_url).await?;

    let queue = Arc::new(PgQueue::new(pool.clone()));
    let runtime_state = Arc::new(PgRuntimeState::new(pool.clone()));
    let import_repo = Arc::new(LoggingImportRepository);

    let http_client = Arc::new(Mutex::new(ResilientHttpClient::new(HttpClientConfig::builder().build())?));
    let site = Arc::new(JsonFeedProvider::new(
        "example.feed",
        "https://example.invalid/api/users",
        http_client,
    ));

    let handlers = Arc::new(HandlerRegistry::new());
    handlers.register(
        "example.feed.post_process",
        Arc::new(|item: &QueueItem| {
            let item = item.clone();
            async move {
                tracing::info!(item_id = %item.id, "post-processed queued item");
                Ok::<(), BoxError>(())
            }
        }),
    );

    let process = Process::new(runtime_state.clone(), None);
    let mut shutdown = ShutdownGuard::new(Duration::from_secs(30));

    let full_sync = Arc::new(FullSyncWorker::new(
        "example.full_sync",
        Duration::from_secs(3600),
        "demo-user",
        "example.feed.post_process",
        runtime_state.clone(),
        site,
        queue.clone(),
        import_repo,
    ));
    process.spawn_worker(full_sync, &mut shutdown);

    let consumer = Arc::new(QueueConsumerWorker::new(
        "example.queue_consumer",
        "worker-1",
        Duration::from_millis(250),
        queue,
        handlers,
    ));
    process.spawn_worker(consumer, &mut shutdown);

    tracing::info!(report = ?process.health_report(), "process started");
    shutdown.wait_for_shutdown().await;
    Ok(())
}
