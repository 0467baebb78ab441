use tantivy::collector::{Count, TopDocs};
use tantivy::schema::{Field, Value};
use tantivy::TantivyDocument;
use tokio_util::sync::CancellationToken;

use docsearch_core::error::{Error, Result};
use docsearch_core::types::{SearchHit, SearchResults};

use crate::highlight::{FieldHighlighter, Highlighter};
use crate::lifecycle::IndexSnapshot;
use crate::query::CompiledQuery;
use crate::schema::DocFields;

/// Runs a compiled query against exactly one snapshot, so hits and the
/// total count always describe the same committed state.
pub fn execute(
	snapshot: &IndexSnapshot,
	compiled: &CompiledQuery,
	fields: &DocFields,
	highlighter: &Highlighter,
	cancel: &CancellationToken,
) -> Result<SearchResults> {
	let searcher = snapshot.searcher();
	let limit = compiled.plan.limit;
	let (top_docs, total) = if limit == 0 {
		(Vec::new(), searcher.search(compiled.query(), &Count).map_err(search_failed)?)
	} else {
		searcher.search(compiled.query(), &(TopDocs::with_limit(limit), Count)).map_err(search_failed)?
	};

	let highlights: Option<FieldHighlighter<'_>> = if compiled.plan.highlight && !top_docs.is_empty() {
		Some(highlighter.prepare(searcher, compiled.text_query(), fields)?)
	} else {
		None
	};

	let mut hits = Vec::with_capacity(top_docs.len());
	for (score, address) in top_docs {
		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}
		let doc: TantivyDocument = searcher.doc(address).map_err(search_failed)?;
		let (highlighted_title, highlighted_body) = match &highlights {
			Some(h) => (h.title(&doc), h.body(&doc)),
			None => (None, None),
		};
		hits.push(SearchHit {
			id: stored_text(&doc, fields.id).unwrap_or_default(),
			title: stored_text(&doc, fields.title).unwrap_or_default(),
			body: stored_text(&doc, fields.body).unwrap_or_default(),
			category: stored_text(&doc, fields.category),
			tags: doc.get_all(fields.tags).filter_map(|v| v.as_str().map(str::to_string)).collect(),
			score,
			highlighted_title,
			highlighted_body,
		});
	}

	Ok(SearchResults { hits, total_hits: total as u64, query: compiled.plan.text().unwrap_or_default().to_string() })
}

fn stored_text(doc: &TantivyDocument, field: Field) -> Option<String> {
	doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string)
}

fn search_failed(err: tantivy::TantivyError) -> Error {
	Error::Operation(format!("search failed: {}", err))
}
