use aya_core::AyaError;
use aya_sites::ImportItem;

/// Minimal stand-in for the out-of-scope domain repository:
/// enough surface for a sync worker to upsert what it fetched, tombstone
/// what's gone, and know what it already has. Concrete bindings (the actual
/// `profiles`/`stories` tables) are a collaborator's job.
#[async_trait::async_trait]
pub trait ImportRepository: Send + Sync {
    /// Inserts or updates one fetched item, keyed by `(source, remote_id)`.
    async fn upsert_import_item(&self, source: &str, item: &ImportItem) -> Result<(), AyaError>;

    /// Marks every previously-known item for `source` whose `remote_id`
    /// isn't in `still_present` as deleted (full-sync tombstoning).
    async fn mark_absent_as_deleted(
        &self,
        source: &str,
        still_present: &[String],
    ) -> Result<(), AyaError>;

    /// All `remote_id`s currently on record for `source`, used by full-sync
    /// to compute the tombstone set.
    async fn list_known_remote_ids(&self, source: &str) -> Result<Vec<String>, AyaError>;
}
