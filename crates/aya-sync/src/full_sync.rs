use crate::import_repository::ImportRepository;
use crate::leader::with_leader_lock;
use aya_queue::QueueRepository;
use aya_runtime_state::RuntimeStateRepository;
use aya_sites::SiteProvider;
use aya_workers::{BoxError, Worker, WorkerContext};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Enumerates every item from an external source and tombstones anything
/// previously seen that's now absent.
/// Runs on an hours-scale interval since a full enumeration is comparatively
/// expensive against most source APIs.
pub struct FullSyncWorker {
    name: String,
    interval: Duration,
    username: String,
    post_process_item_type: String,
    runtime_state: Arc<dyn RuntimeStateRepository>,
    site: Arc<dyn SiteProvider>,
    queue: Arc<dyn QueueRepository>,
    import_repo: Arc<dyn ImportRepository>,
}

impl FullSyncWorker {
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
}

#[async_trait::async_trait]
impl Worker for FullSyncWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<(), BoxError> {
        let source = self.site.kind().to_string();
        let outcome = with_leader_lock(self.runtime_state.as_ref(), &self.name, || async {
            let items = self.site.fetch_all(&self.username).await?;
            let mut seen_remote_ids = Vec::with_capacity(items.len());

            for item in &items {
                self.import_repo.upsert_import_item(&source, item).await?;
                seen_remote_ids.push(item.remote_id.clone());

                self.queue
                    .enqueue(
                        &self.post_process_item_type,
                        serde_json::json!({ "source": source, "remote_id": item.remote_id }),
                        0,
                        0,
                        None,
                    )
                    .await?;
            }

            self.import_repo
                .mark_absent_as_deleted(&source, &seen_remote_ids)
                .await?;

            self.runtime_state
                .set_time(&format!("{}.last_run", self.name), Utc::now())
                .await?;

            Ok(items.len())
        })
        .await?;

        if let Some(count) = outcome {
            ctx.record_items_processed(count as u64);
            #[cfg(feature = "tracing")]
            tracing::info!(worker = %self.name, items = count, "full sync cycle complete");
        }

        Ok(())
    }
}
