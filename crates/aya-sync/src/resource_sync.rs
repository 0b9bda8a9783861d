use crate::import_repository::ImportRepository;
use crate::leader::with_leader_lock;
use aya_runtime_state::RuntimeStateRepository;
use aya_sites::{ImportItem, SiteProvider};
use aya_workers::{BoxError, Worker, WorkerContext};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Refreshes per-resource metadata (star counts, issue counts, view
/// counts, whatever `SiteProvider::check` surfaces) for every already-known
/// item of a source. Paces itself with
/// `per_resource_delay` between calls so it doesn't trip the source's own
/// rate limit; the resilient HTTP client's circuit breaker is the backstop
/// if it does anyway.
pub struct ResourceSyncWorker {
    name: String,
    interval: Duration,
    per_resource_delay: Duration,
    runtime_state: Arc<dyn RuntimeStateRepository>,
    site: Arc<dyn SiteProvider>,
    import_repo: Arc<dyn ImportRepository>,
}

impl ResourceSyncWorker {
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        per_resource_delay: Duration,
        runtime_state: Arc<dyn RuntimeStateRepository>,
        site: Arc<dyn SiteProvider>,
        import_repo: Arc<dyn ImportRepository>,
    ) -> Self {
        Self {
            name: name.into(),
            interval,
            per_resource_delay,
            runtime_state,
            site,
            import_repo,
        }
    }
}

#[async_trait::async_trait]
impl Worker for ResourceSyncWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<(), BoxError> {
        let source = self.site.kind().to_string();
        let outcome = with_leader_lock(self.runtime_state.as_ref(), &self.name, || async {
            let remote_ids = self.import_repo.list_known_remote_ids(&source).await?;
            let mut processed = 0u64;

            for (index, remote_id) in remote_ids.iter().enumerate() {
                if ctx.is_cancelled() {
                    break;
                }
                if index > 0 {
                    tokio::time::sleep(self.per_resource_delay).await;
                }

                match self.site.check(remote_id).await {
                    Ok(metadata) => {
                        let mut item = ImportItem::new(
                            metadata.remote_id.clone(),
                            metadata.display_name,
                            remote_id.clone(),
                            source.clone(),
                        );
                        item.thumbnail_url = metadata.thumbnail_url;
                        self.import_repo.upsert_import_item(&source, &item).await?;
                        processed += 1;
                    }
                    Err(err) => {
                        // A single resource failing (rate limit, 404 since
                        // deleted upstream) never aborts the whole cycle.
                        #[cfg(feature = "tracing")]
                        tracing::warn!(worker = %self.name, resource = %remote_id, error = %err, "resource refresh failed, continuing");
                        #[cfg(not(feature = "tracing"))]
                        let _ = err;
                    }
                }
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
