use tantivy::indexer::UserOperation;
use tantivy::{TantivyDocument, Term};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use docsearch_core::config::Settings;
use docsearch_core::error::{Error, Result};
use docsearch_core::traits::SearchIndexer;
use docsearch_core::types::{CanonicalDocument, DocumentId, SearchRequest, SearchResults};

use crate::highlight::{HighlightSettings, Highlighter};
use crate::lifecycle::{IndexLocation, IndexManager};
use crate::query::QueryCompiler;
use crate::schema::DocFields;
use crate::search::execute;

/// Indexing pipeline and search entry point over one managed index.
pub struct TextIndex {
	manager: IndexManager,
	compiler: QueryCompiler,
	highlighter: Highlighter,
}

impl TextIndex {
	pub fn open(settings: &Settings) -> Result<Self> {
		let manager = IndexManager::open(&settings.index)?;
		Ok(Self::new(manager, HighlightSettings::from(&settings.search)))
	}

	pub fn in_memory(writer_heap_bytes: usize) -> Result<Self> {
		let manager = IndexManager::open_or_create(IndexLocation::InMemory, writer_heap_bytes)?;
		Ok(Self::new(manager, HighlightSettings::default()))
	}

	pub fn new(manager: IndexManager, highlight: HighlightSettings) -> Self {
		let compiler = QueryCompiler::new(manager.index(), *manager.fields());
		Self { manager, compiler, highlighter: Highlighter::new(highlight) }
	}

	pub fn manager(&self) -> &IndexManager {
		&self.manager
	}

	pub fn close(&self) -> Result<()> {
		self.manager.close()
	}
}

/// Per-field projection of a canonical document. Category is left out
/// entirely when absent so no category filter can match it.
pub fn project(doc: &CanonicalDocument, fields: &DocFields) -> TantivyDocument {
	let mut record = TantivyDocument::default();
	record.add_text(fields.id, doc.id.to_string());
	record.add_text(fields.title, &doc.title);
	record.add_text(fields.body, &doc.body);
	for tag in &doc.tags {
		record.add_text(fields.tags, tag);
	}
	if let Some(category) = &doc.category {
		record.add_text(fields.category, category);
	}
	record
}

fn id_term(fields: &DocFields, id: &DocumentId) -> Term {
	Term::from_field_text(fields.id, &id.to_string())
}

impl SearchIndexer for TextIndex {
	fn index_create(&self, doc: &CanonicalDocument) -> Result<()> {
		let opstamp = self.manager.mutate(|writer, fields| writer.add_document(project(doc, fields)))?;
		debug!(id = %doc.id, opstamp, "indexed document");
		Ok(())
	}

	/// Delete-then-add by key as one operation group, so no commit can see
	/// zero or two records for `id`.
	fn index_update(&self, id: &DocumentId, doc: &CanonicalDocument) -> Result<()> {
		if doc.id != *id {
			return Err(Error::InvalidIdentifier(format!("update for {} carries document {}", id, doc.id)));
		}
		let opstamp = self.manager.mutate(|writer, fields| {
			writer.run(vec![UserOperation::Delete(id_term(fields, id)), UserOperation::Add(project(doc, fields))])
		})?;
		debug!(%id, opstamp, "reindexed document");
		Ok(())
	}

	fn index_delete(&self, id: &DocumentId) -> Result<()> {
		let opstamp = self.manager.mutate(|writer, fields| Ok(writer.delete_term(id_term(fields, id))))?;
		debug!(%id, opstamp, "removed document from index");
		Ok(())
	}

	fn rebuild(&self, docs: &[CanonicalDocument]) -> Result<usize> {
		let count = self.manager.mutate(|writer, fields| {
			writer.delete_all_documents()?;
			for doc in docs {
				writer.add_document(project(doc, fields))?;
			}
			Ok(docs.len())
		})?;
		debug!(count, "index rebuilt");
		Ok(count)
	}

	fn search(&self, request: &SearchRequest, cancel: &CancellationToken) -> Result<SearchResults> {
		let compiled = self.compiler.compile(request)?;
		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}
		let snapshot = self.manager.snapshot()?;
		execute(&snapshot, &compiled, self.manager.fields(), &self.highlighter, cancel)
	}

	fn indexed_count(&self) -> Result<u64> {
		Ok(self.manager.snapshot()?.num_docs())
	}
}
