use crate::import_repository::ImportRepository;
use crate::leader::with_leader_lock;
use aya_queue::QueueRepository;
use aya_runtime_state::RuntimeStateRepository;
use aya_sites::SiteProvider;
use aya_workers::{BoxError, Worker, WorkerContext};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Fetches only items newer than a stored time cursor. Does not
/// tombstone: the source is assumed append-mostly, and a full-sync
/// worker handles deletions separately.
pub struct IncrementalSyncWorker {
    name: String,
    interval: Duration,
    username: String,
    post_process_item_type: String,
    runtime_state: Arc<dyn RuntimeStateRepository>,
    site: Arc<dyn SiteProvider>,
    queue: Arc<dyn QueueRepository>,
    import_repo: Arc<dyn ImportRepository>,
}

impl IncrementalSyncWorker {
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        username: impl Into<String>,
        post_process_item_type: impl Into<String>,
        runtime_state: Arc<dyn RuntimeStateRepository>,
        site: Arc<dyn SiteProvider>,
        queue: Arc<dyn QueueRepository>,
        import_repo: Arc<dyn ImportRepository>,
    ) -> Self {
        Self {
            name: name.into(),
            interval,
            username: username.into(),
            post_process_item_type: post_process_item_type.into(),
            runtime_state,
            site,
            queue,
            import_repo,
        }
    }

    fn cursor_key(&self) -> String {
        format!("{}.published_since", self.name)
    }
}

#[async_trait::async_trait]
impl Worker for IncrementalSyncWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<(), BoxError> {
        let source = self.site.kind().to_string();
        let outcome = with_leader_lock(self.runtime_state.as_ref(), &self.name, || async {
            let published_since = self.runtime_state.get_time(&self.cursor_key()).await?;

            let items = self.site.fetch_all(&self.username).await?;
            let mut newest_seen = published_since;
            let mut processed = 0u64;

            for item in &items {
                if let (Some(published_at), Some(since)) = (item.published_at, published_since) {
                    if published_at <= since {
                        continue;
                    }
                }

                self.import_repo.upsert_import_item(&source, item).await?;
                self.queue
                    .enqueue(
                        &self.post_process_item_type,
                        serde_json::json!({ "source": source, "remote_id": item.remote_id }),
                        0,
                        0,
                        None,
                    )
                    .await?;
                processed += 1;

                if let Some(published_at) = item.published_at {
                    newest_seen = Some(newest_seen.map_or(published_at, |cur| cur.max(published_at)));
                }
            }

            if let Some(cursor) = newest_seen {
                self.runtime_state.set_time(&self.cursor_key(), cursor).await?;
            }
            self.runtime_state
                .set_time(&format!("{}.last_run", self.name), Utc::now())
                .await?;

            Ok(processed)
        })
        .await?;

        if let Some(processed) = outcome {
            ctx.record_items_processed(processed);
        }

        Ok(())
    }
}
