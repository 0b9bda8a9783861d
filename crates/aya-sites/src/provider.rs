use crate::model::{CheckResult, ImportItem};
use aya_core::AyaError;

/// The contract every external site adapter implements.
///
/// Parsing (RSS, JSON-LD, HTML scraping) is wholly internal to the adapter;
/// the only cross-cutting requirement is that each emitted [`ImportItem`]
/// carries a `remote_id` that is stable and unique within that source.
/// Adapter errors bubble to the calling sync worker, which records the
/// failure and continues with the next link rather than aborting the
/// whole cycle.
#[async_trait::async_trait]
pub trait SiteProvider: Send + Sync {
    /// Adapter identity, e.g. `"youtube"`, `"github"`, `"speakerdeck"`.
    fn kind(&self) -> &str;

    /// Validates a user-supplied URL and fetches display metadata.
    async fn check(&self, url: &str) -> Result<CheckResult, AyaError>;

    /// Enumerates every item currently published under `username`.
    async fn fetch_all(&self, username: &str) -> Result<Vec<ImportItem>, AyaError>;
}
