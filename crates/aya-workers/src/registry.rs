use aya_queue::QueueItem;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A handler for one queue item `type`.
///
/// Handlers must be idempotent: at-least-once delivery means the same item
/// `id` can reach `handle` twice if a prior lease expired before the first
/// invocation's `Complete` landed.
#[async_trait::async_trait]
pub trait QueueHandler: Send + Sync {
    async fn handle(&self, item: &QueueItem) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait::async_trait]
impl<F, Fut> QueueHandler for F
where
    F: Fn(&QueueItem) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>> + Send,
{
    async fn handle(&self, item: &QueueItem) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (self)(item).await
    }
}

/// Maps a queue item `type` to the handler that processes it.
///
/// Registration is call-once per type at startup; a later `register` for
/// the same type simply overwrites the earlier one rather than erroring.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn QueueHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, item_type: impl Into<String>, handler: Arc<dyn QueueHandler>) {
        self.handlers.write().unwrap().insert(item_type.into(), handler);
    }

    pub fn get(&self, item_type: &str) -> Option<Arc<dyn QueueHandler>> {
        self.handlers.read().unwrap().get(item_type).cloned()
    }
}
