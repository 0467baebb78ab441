use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{CanonicalDocument, DocumentId, DocumentPatch, SearchRequest, SearchResults};

/// The authoritative record store. Search never reads from it; the service
/// layer writes here first and mirrors the result into the index.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, doc: CanonicalDocument) -> Result<CanonicalDocument>;
    async fn get(&self, id: &DocumentId) -> Result<Option<CanonicalDocument>>;
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<CanonicalDocument>>;
    async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<CanonicalDocument>>;
    /// Documents carrying every tag in `tags`. An empty tag list matches nothing.
    async fn list_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<CanonicalDocument>>;
    async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<Option<CanonicalDocument>>;
    async fn delete(&self, id: &DocumentId) -> Result<bool>;
    async fn count(&self) -> Result<u64>;
    /// Releases connections. Later calls fail with `StoreUnavailable`.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Inverted-index view over canonical documents.
///
/// Every mutation is committed before it returns. Implementations block on
/// durable storage, so async callers should run them on a blocking pool.
pub trait SearchIndexer: Send + Sync {
    fn index_create(&self, doc: &CanonicalDocument) -> Result<()>;
    fn index_update(&self, id: &DocumentId, doc: &CanonicalDocument) -> Result<()>;
    fn index_delete(&self, id: &DocumentId) -> Result<()>;
    /// Replaces the whole index contents with `docs` in a single commit.
    fn rebuild(&self, docs: &[CanonicalDocument]) -> Result<usize>;
    fn search(&self, request: &SearchRequest, cancel: &CancellationToken) -> Result<SearchResults>;
    fn indexed_count(&self) -> Result<u64>;
}
