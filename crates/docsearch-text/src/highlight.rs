use tantivy::query::Query;
use tantivy::schema::Field;
use tantivy::snippet::{Snippet, SnippetGenerator};
use tantivy::{Searcher, TantivyDocument};

use docsearch_core::config::SearchSettings;
use docsearch_core::error::{Error, Result};

use crate::schema::DocFields;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSettings {
	pub fragment_chars: usize,
	pub pre: String,
	pub post: String,
}

impl Default for HighlightSettings {
	fn default() -> Self {
		Self { fragment_chars: 150, pre: "<mark>".to_string(), post: "</mark>".to_string() }
	}
}

impl From<&SearchSettings> for HighlightSettings {
	fn from(search: &SearchSettings) -> Self {
		Self { fragment_chars: search.fragment_chars, pre: search.highlight_pre.clone(), post: search.highlight_post.clone() }
	}
}

pub struct Highlighter {
	settings: HighlightSettings,
}

impl Highlighter {
	pub fn new(settings: HighlightSettings) -> Self {
		Self { settings }
	}

	/// Prepares per-field fragment extraction for one search. `text_query`
	/// must be the free-text clause only, so filters never get highlighted.
	pub fn prepare(&self, searcher: &Searcher, text_query: &dyn Query, fields: &DocFields) -> Result<FieldHighlighter<'_>> {
		Ok(FieldHighlighter {
			title: self.generator(searcher, text_query, fields.title)?,
			body: self.generator(searcher, text_query, fields.body)?,
			settings: &self.settings,
		})
	}

	fn generator(&self, searcher: &Searcher, text_query: &dyn Query, field: Field) -> Result<SnippetGenerator> {
		let mut generator = SnippetGenerator::create(searcher, text_query, field)
			.map_err(|e| Error::Operation(format!("preparing highlighter: {}", e)))?;
		generator.set_max_num_chars(self.settings.fragment_chars);
		Ok(generator)
	}
}

pub struct FieldHighlighter<'a> {
	title: SnippetGenerator,
	body: SnippetGenerator,
	settings: &'a HighlightSettings,
}

impl FieldHighlighter<'_> {
	pub fn title(&self, doc: &TantivyDocument) -> Option<String> {
		self.render(&self.title.snippet_from_doc(doc))
	}

	pub fn body(&self, doc: &TantivyDocument) -> Option<String> {
		self.render(&self.body.snippet_from_doc(doc))
	}

	/// Best fragment with each matched span wrapped in the markers; `None`
	/// when nothing in the field matched.
	fn render(&self, snippet: &Snippet) -> Option<String> {
		if snippet.highlighted().is_empty() {
			return None;
		}
		let fragment = snippet.fragment();
		let mut out = String::with_capacity(fragment.len() + 16 * snippet.highlighted().len());
		let mut cursor = 0;
		for range in snippet.highlighted() {
			if range.start < cursor {
				continue;
			}
			out.push_str(&fragment[cursor..range.start]);
			out.push_str(&self.settings.pre);
			out.push_str(&fragment[range.clone()]);
			out.push_str(&self.settings.post);
			cursor = range.end;
		}
		out.push_str(&fragment[cursor..]);
		Some(out)
	}
}
