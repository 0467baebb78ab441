use async_trait::async_trait;
use parking_lot::RwLock;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::DocumentStore;
use docsearch_core::types::{CanonicalDocument, DocumentId, DocumentPatch};

/// Process-local canonical store. Keeps insertion order for listing.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<Vec<CanonicalDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, doc: CanonicalDocument) -> Result<CanonicalDocument> {
        let mut docs = self.docs.write();
        if docs.iter().any(|d| d.id == doc.id) {
            return Err(Error::Operation(format!("document {} already exists", doc.id)));
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn get(&self, id: &DocumentId) -> Result<Option<CanonicalDocument>> {
        Ok(self.docs.read().iter().find(|d| d.id == *id).cloned())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<CanonicalDocument>> {
        Ok(self.docs.read().iter().skip(offset).take(limit).cloned().collect())
    }

    async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<CanonicalDocument>> {
        Ok(self
            .docs
            .read()
            .iter()
            .filter(|d| d.category.as_deref() == Some(category))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<CanonicalDocument>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .docs
            .read()
            .iter()
            .filter(|d| tags.iter().all(|t| d.tags.contains(t)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<Option<CanonicalDocument>> {
        let mut docs = self.docs.write();
        let Some(doc) = docs.iter_mut().find(|d| d.id == *id) else {
            return Ok(None);
        };
        doc.apply(patch);
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, id: &DocumentId) -> Result<bool> {
        let mut docs = self.docs.write();
        let before = docs.len();
        docs.retain(|d| d.id != *id);
        Ok(docs.len() != before)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.docs.read().len() as u64)
    }
}
