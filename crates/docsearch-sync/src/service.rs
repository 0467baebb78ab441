//! Sequences canonical-store writes with index mutations.
//!
//! The store is written first and the index second, on every path. A failure
//! between the two leaves the store authoritative and the index stale for
//! that document until [`DocumentService::reindex`] or
//! [`DocumentService::rebuild_index`] runs. Search is therefore only
//! eventually consistent with the store, bounded by one successful commit.
//!
//! Writes hold a shared gate from the store write until their index commit;
//! a rebuild holds it exclusively from its first store read until its
//! commit, so no write can land in between and be wiped.
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::{DocumentStore, SearchIndexer};
use docsearch_core::types::{CanonicalDocument, DocumentDraft, DocumentId, DocumentPatch, SearchRequest, SearchResults};

/// Page size used when streaming the store into a rebuild.
const REBUILD_PAGE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexOutcome {
    /// The document exists and its index record was replaced.
    Indexed,
    /// The document is gone; any leftover index record was removed.
    Removed,
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SearchIndexer>,
    gate: Arc<RwLock<()>>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, index: Arc<dyn SearchIndexer>) -> Self {
        Self { store, index, gate: Arc::new(RwLock::new(())) }
    }

    pub async fn create(&self, draft: DocumentDraft) -> Result<CanonicalDocument> {
        let gate = self.write_gate().await;
        let doc = self.store.create(CanonicalDocument::new(draft)).await?;
        let indexed = doc.clone();
        self.mirror(gate, doc.id, "create", move |index| index.index_create(&indexed)).await?;
        Ok(doc)
    }

    /// Malformed IDs are treated as unknown.
    pub async fn get(&self, raw_id: &str) -> Result<Option<CanonicalDocument>> {
        let Some(id) = parse_id(raw_id) else { return Ok(None) };
        self.store.get(&id).await
    }

    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<CanonicalDocument>> {
        self.store.list(limit, offset).await
    }

    pub async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<CanonicalDocument>> {
        self.store.list_by_category(category, limit).await
    }

    pub async fn list_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<CanonicalDocument>> {
        self.store.list_by_tags(tags, limit).await
    }

    pub async fn update(&self, raw_id: &str, patch: DocumentPatch) -> Result<Option<CanonicalDocument>> {
        let Some(id) = parse_id(raw_id) else { return Ok(None) };
        let gate = self.write_gate().await;
        let Some(doc) = self.store.update(&id, patch).await? else { return Ok(None) };
        let indexed = doc.clone();
        self.mirror(gate, id, "update", move |index| index.index_update(&id, &indexed)).await?;
        Ok(Some(doc))
    }

    /// Returns whether the store held the document. The index is only
    /// touched when it did.
    pub async fn delete(&self, raw_id: &str) -> Result<bool> {
        let Some(id) = parse_id(raw_id) else { return Ok(false) };
        let gate = self.write_gate().await;
        let deleted = self.store.delete(&id).await?;
        if deleted {
            self.mirror(gate, id, "delete", move |index| index.index_delete(&id)).await?;
        }
        Ok(deleted)
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count().await
    }

    pub async fn indexed_count(&self) -> Result<u64> {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.indexed_count()).await.map_err(join_error)?
    }

    /// Runs on the blocking pool. Dropping the returned future cancels the
    /// search between hits.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResults> {
        let cancel = CancellationToken::new();
        let _abandon_on_drop = cancel.clone().drop_guard();
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.search(&request, &cancel)).await.map_err(join_error)?
    }

    /// Brings the index record for one document in line with the store.
    /// Safe to repeat.
    pub async fn reindex(&self, raw_id: &str) -> Result<ReindexOutcome> {
        let id = DocumentId::parse(raw_id)?;
        let gate = self.write_gate().await;
        match self.store.get(&id).await? {
            Some(doc) => {
                self.mirror(gate, id, "reindex", move |index| index.index_update(&id, &doc)).await?;
                info!(%id, "document reindexed");
                Ok(ReindexOutcome::Indexed)
            }
            None => {
                self.mirror(gate, id, "reindex", move |index| index.index_delete(&id)).await?;
                info!(%id, "removed index record of missing document");
                Ok(ReindexOutcome::Removed)
            }
        }
    }

    /// Replaces the whole index with the store contents in a single commit.
    /// Writes wait until the rebuild has committed.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let exclusive = Arc::clone(&self.gate).write_owned().await;
        let mut docs = Vec::new();
        loop {
            let page = self.store.list(REBUILD_PAGE, docs.len()).await?;
            let done = page.len() < REBUILD_PAGE;
            docs.extend(page);
            if done {
                break;
            }
        }
        let index = Arc::clone(&self.index);
        let count = tokio::task::spawn_blocking(move || {
            let _exclusive = exclusive;
            index.rebuild(&docs)
        })
        .await
        .map_err(join_error)??;
        info!(count, "search index rebuilt from store");
        Ok(count)
    }

    /// Releases the store's connections.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }

    async fn write_gate(&self) -> OwnedRwLockReadGuard<()> {
        Arc::clone(&self.gate).read_owned().await
    }

    /// Applies one index mutation on the blocking pool. The task runs to
    /// commit-or-fail even if the caller goes away, and keeps `gate` until then.
    async fn mirror<F>(&self, gate: OwnedRwLockReadGuard<()>, id: DocumentId, op: &'static str, apply: F) -> Result<()>
    where
        F: FnOnce(&dyn SearchIndexer) -> Result<()> + Send + 'static,
    {
        let index = Arc::clone(&self.index);
        let outcome = tokio::task::spawn_blocking(move || {
            let _gate = gate;
            apply(index.as_ref())
        })
        .await
        .map_err(join_error)
        .and_then(|r| r);
        match &outcome {
            Ok(()) => debug!(%id, op, "index in sync"),
            Err(err) => warn!(%id, op, %err, "store write kept but index mutation failed; reindex this document"),
        }
        outcome
    }
}

fn parse_id(raw: &str) -> Option<DocumentId> {
    match DocumentId::parse(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            debug!(raw, "ignoring malformed document id");
            None
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> Error {
    Error::Operation(format!("index task failed: {}", err))
}
