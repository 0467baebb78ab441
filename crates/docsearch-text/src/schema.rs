use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

use docsearch_core::error::{Error, Result};

pub const ANALYZER_NAME: &str = "doc_text";

pub const ID_FIELD: &str = "id";
pub const TITLE_FIELD: &str = "title";
pub const BODY_FIELD: &str = "body";
pub const TAGS_FIELD: &str = "tags";
pub const CATEGORY_FIELD: &str = "category";

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(ID_FIELD, STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(ANALYZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field(TITLE_FIELD, text_options.clone());
	schema_builder.add_text_field(BODY_FIELD, text_options.clone());
	// Repeated values under one field: one entry per tag.
	schema_builder.add_text_field(TAGS_FIELD, text_options);
	schema_builder.add_text_field(CATEGORY_FIELD, STRING | STORED);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(ANALYZER_NAME, tokenizer);
}

/// Field handles resolved once per index.
#[derive(Debug, Clone, Copy)]
pub struct DocFields {
	pub id: Field,
	pub title: Field,
	pub body: Field,
	pub tags: Field,
	pub category: Field,
}

impl DocFields {
	pub fn resolve(schema: &Schema) -> Result<Self> {
		let get = |name: &str| schema.get_field(name).map_err(|e| Error::IndexUnavailable(format!("schema is missing '{}': {}", name, e)));
		Ok(Self { id: get(ID_FIELD)?, title: get(TITLE_FIELD)?, body: get(BODY_FIELD)?, tags: get(TAGS_FIELD)?, category: get(CATEGORY_FIELD)? })
	}
}
