use crate::import_repository::ImportRepository;
use crate::leader::with_leader_lock;
use aya_queue::QueueRepository;
use aya_runtime_state::RuntimeStateRepository;
use aya_sites::SiteProvider;
use aya_workers::{BoxError, Worker, WorkerContext};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Long-polls a source that has no webhook support, standing in for
/// webhook delivery where the external API doesn't offer one. Behaviorally
/// identical to the incremental sync worker's one-cycle body; the
/// distinguishing trait is a short interval tuned for near-real-time
/// pickup rather than an hours-scale enumeration cadence.
pub struct PollingAdapterWorker {
    name: String,
    interval: Duration,
    username: String,
    post_process_item_type: String,
    runtime_state: Arc<dyn RuntimeStateRepository>,
    site: Arc<dyn SiteProvider>,
    queue: Arc<dyn QueueRepository>,
    import_repo: Arc<dyn ImportRepository>,
}

impl PollingAdapterWorker {
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
        format!("{}.last_seen_at", self.name)
    }
}

#[async_trait::async_trait]
impl Worker for PollingAdapterWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<(), BoxError> {
        let source = self.site.kind().to_string();
        let outcome = with_leader_lock(self.runtime_state.as_ref(), &self.name, || async {
            let last_seen = self.runtime_state.get_time(&self.cursor_key()).await?;
            let items = self.site.fetch_all(&self.username).await?;
            let mut newest = last_seen;
            let mut processed = 0u64;

            for item in &items {
                if let (Some(published_at), Some(since)) = (item.published_at, last_seen) {
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
                    newest = Some(newest.map_or(published_at, |cur| cur.max(published_at)));
                }
            }

            if let Some(cursor) = newest {
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

#[cfg(test)]
mod tests {
    use super::*;
    use aya_core::AyaError;
    use aya_queue::QueueItem;
    use aya_runtime_state::RuntimeStateEntry;
    use aya_sites::CheckResult;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct FakeState {
        times: Mutex<HashMap<String, chrono::DateTime<Utc>>>,
    }

    #[async_trait]
    impl RuntimeStateRepository for FakeState {
        async fn get(&self, _key: &str) -> Result<Option<String>, AyaError> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), AyaError> {
            Ok(())
        }
        async fn remove(&self, _key: &str) -> Result<(), AyaError> {
            Ok(())
        }
        async fn list_by_prefix(&self, _prefix: &str) -> Result<Vec<RuntimeStateEntry>, AyaError> {
            Ok(vec![])
        }
        async fn get_time(&self, key: &str) -> Result<Option<chrono::DateTime<Utc>>, AyaError> {
            Ok(self.times.lock().unwrap().get(key).copied())
        }
        async fn set_time(&self, key: &str, value: chrono::DateTime<Utc>) -> Result<(), AyaError> {
            self.times.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
        async fn try_lock(&self, _id: i64) -> Result<bool, AyaError> {
            Ok(true)
        }
        async fn release_lock(&self, _id: i64) -> Result<(), AyaError> {
            Ok(())
        }
    }

    struct FakeSite {
        items: Vec<ImportItem>,
    }

    #[async_trait]
    impl SiteProvider for FakeSite {
        fn kind(&self) -> &str {
            "fake"
        }
        async fn check(&self, url: &str) -> Result<CheckResult, AyaError> {
            Ok(CheckResult {
                remote_id: url.to_string(),
                display_name: url.to_string(),
                thumbnail_url: None,
            })
        }
        async fn fetch_all(&self, _username: &str) -> Result<Vec<ImportItem>, AyaError> {
            Ok(self.items.clone())
        }
    }

    #[derive(Default)]
    struct FakeQueue {
        enqueued: AtomicUsize,
    }

    #[async_trait]
    impl QueueRepository for FakeQueue {
        async fn enqueue(
            &self,
            _item_type: &str,
            _payload: Value,
            _max_retries: i32,
            _visibility_timeout_secs: i32,
            _scheduled_at: Option<chrono::DateTime<Utc>>,
        ) -> Result<String, AyaError> {
            self.enqueued.fetch_add(1, Ordering::SeqCst);
            Ok("q1".into())
        }
        async fn claim_next(&self, _worker_id: &str) -> Result<Option<QueueItem>, AyaError> {
            Ok(None)
        }
        async fn complete(&self, _id: &str, _worker_id: &str) -> Result<(), AyaError> {
            Ok(())
        }
        async fn fail(
            &self,
            _id: &str,
            _worker_id: &str,
            _error_message: &str,
            _backoff_seconds: i64,
        ) -> Result<(), AyaError> {
            Ok(())
        }
        async fn list_by_type(&self, _item_type: &str, _limit: i64) -> Result<Vec<QueueItem>, AyaError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct FakeImportRepo {
        upserted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImportRepository for FakeImportRepo {
        async fn upsert_import_item(&self, _source: &str, item: &ImportItem) -> Result<(), AyaError> {
            self.upserted.lock().unwrap().push(item.remote_id.clone());
            Ok(())
        }
        async fn mark_absent_as_deleted(&self, _source: &str, _still_present: &[String]) -> Result<(), AyaError> {
            Ok(())
        }
        async fn list_known_remote_ids(&self, _source: &str) -> Result<Vec<String>, AyaError> {
            Ok(vec![])
        }
    }

    fn item_at(remote_id: &str, secs_since_epoch: i64) -> ImportItem {
        let mut item = ImportItem::new(remote_id, remote_id, format!("https://x/{remote_id}"), "video");
        item.published_at = Some(Utc.timestamp_opt(secs_since_epoch, 0).unwrap());
        item
    }

    #[tokio::test]
    async fn advances_the_last_seen_cursor_past_the_newest_item() {
        let runtime_state = Arc::new(FakeState::default());
        let site = Arc::new(FakeSite {
            items: vec![item_at("a", 100), item_at("b", 200)],
        });
        let queue = Arc::new(FakeQueue::default());
        let import_repo = Arc::new(FakeImportRepo::default());

        let worker = PollingAdapterWorker::new(
            "poll",
            Duration::from_secs(5),
            "user",
            "post_process",
            runtime_state.clone(),
            site,
            queue.clone(),
            import_repo,
        );
        let ctx = WorkerContext::new(CancellationToken::new());
        worker.execute(&ctx).await.unwrap();

        assert_eq!(queue.enqueued.load(Ordering::SeqCst), 2);
        let advanced = *runtime_state.times.lock().unwrap().get("poll.last_seen_at").unwrap();
        assert_eq!(advanced, Utc.timestamp_opt(200, 0).unwrap());
    }
}
