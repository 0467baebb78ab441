//! Query compilation in two steps: a request becomes a declarative
//! [`QueryPlan`] (clauses with roles and per-field weights), and the plan is
//! lowered to tantivy queries by [`QueryCompiler`].
use tantivy::query::{BooleanQuery, ConstScoreQuery, Occur, Query, QueryClone, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, Term};

use docsearch_core::error::{Error, Result};
use docsearch_core::types::SearchRequest;

use crate::schema::DocFields;

/// Analyzed fields the free-text clause runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
	Title,
	Body,
	Tags,
}

impl TextField {
	pub const ALL: [TextField; 3] = [TextField::Title, TextField::Tags, TextField::Body];

	/// Relative boost: title highest, tags next, body baseline.
	pub fn weight(self) -> f32 {
		match self {
			TextField::Title => 3.0,
			TextField::Tags => 2.0,
			TextField::Body => 1.0,
		}
	}

	fn resolve(self, fields: &DocFields) -> Field {
		match self {
			TextField::Title => fields.title,
			TextField::Body => fields.body,
			TextField::Tags => fields.tags,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
	/// Must match and contributes to the score.
	Must,
	/// Must match, contributes nothing to the score.
	Filter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
	/// Free text matched with OR semantics across terms and weighted fields.
	Text { text: String, fields: Vec<(TextField, f32)> },
	/// Exact category equality. Records without a category never match.
	CategoryEquals(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedClause {
	pub occur: Occurrence,
	pub clause: Clause,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
	pub clauses: Vec<PlannedClause>,
	pub limit: usize,
	pub highlight: bool,
}

impl QueryPlan {
	pub fn from_request(request: &SearchRequest) -> Self {
		let mut clauses = vec![PlannedClause {
			occur: Occurrence::Must,
			clause: Clause::Text {
				text: request.query.clone(),
				fields: TextField::ALL.iter().map(|f| (*f, f.weight())).collect(),
			},
		}];
		if let Some(category) = &request.category {
			clauses.push(PlannedClause { occur: Occurrence::Filter, clause: Clause::CategoryEquals(category.clone()) });
		}
		Self { clauses, limit: request.limit, highlight: request.highlight }
	}

	/// The free-text string, the only input highlighting looks at.
	pub fn text(&self) -> Option<&str> {
		self.clauses.iter().find_map(|c| match &c.clause {
			Clause::Text { text, .. } => Some(text.as_str()),
			Clause::CategoryEquals(_) => None,
		})
	}

	pub fn category(&self) -> Option<&str> {
		self.clauses.iter().find_map(|c| match &c.clause {
			Clause::CategoryEquals(category) => Some(category.as_str()),
			Clause::Text { .. } => None,
		})
	}
}

/// A plan lowered against one index.
pub struct CompiledQuery {
	pub plan: QueryPlan,
	text_query: Box<dyn Query>,
	query: Box<dyn Query>,
}

impl CompiledQuery {
	/// Full query: text clause plus filters.
	pub fn query(&self) -> &dyn Query {
		self.query.as_ref()
	}

	/// The free-text clause alone, without filters.
	pub fn text_query(&self) -> &dyn Query {
		self.text_query.as_ref()
	}
}

pub struct QueryCompiler {
	index: Index,
	fields: DocFields,
}

impl QueryCompiler {
	pub fn new(index: &Index, fields: DocFields) -> Self {
		Self { index: index.clone(), fields }
	}

	pub fn compile(&self, request: &SearchRequest) -> Result<CompiledQuery> {
		self.lower(QueryPlan::from_request(request))
	}

	pub fn lower(&self, plan: QueryPlan) -> Result<CompiledQuery> {
		let mut text_query: Option<Box<dyn Query>> = None;
		let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
		for planned in &plan.clauses {
			let lowered = match &planned.clause {
				Clause::Text { text, fields } => {
					let query = self.lower_text(text, fields)?;
					text_query = Some(query.box_clone());
					query
				}
				Clause::CategoryEquals(category) => self.lower_category(category),
			};
			let lowered = match planned.occur {
				Occurrence::Must => lowered,
				Occurrence::Filter => Box::new(ConstScoreQuery::new(lowered, 0.0)) as Box<dyn Query>,
			};
			subqueries.push((Occur::Must, lowered));
		}
		let text_query = text_query.ok_or_else(|| Error::Operation("query plan has no text clause".to_string()))?;
		let query: Box<dyn Query> = if subqueries.len() == 1 {
			text_query.box_clone()
		} else {
			Box::new(BooleanQuery::new(subqueries))
		};
		Ok(CompiledQuery { plan, text_query, query })
	}

	fn lower_text(&self, text: &str, weights: &[(TextField, f32)]) -> Result<Box<dyn Query>> {
		let fields: Vec<Field> = weights.iter().map(|(f, _)| f.resolve(&self.fields)).collect();
		let mut parser = QueryParser::for_index(&self.index, fields);
		for (field, weight) in weights {
			parser.set_field_boost(field.resolve(&self.fields), *weight);
		}
		parser
			.parse_query(text)
			.map_err(|e| Error::QuerySyntax { query: text.to_string(), reason: e.to_string() })
	}

	fn lower_category(&self, category: &str) -> Box<dyn Query> {
		let term = Term::from_field_text(self.fields.category, category);
		Box::new(TermQuery::new(term, IndexRecordOption::Basic))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{build_schema, register_tokenizer};

	fn compiler() -> QueryCompiler {
		let index = Index::create_in_ram(build_schema());
		register_tokenizer(&index);
		let fields = DocFields::resolve(&index.schema()).expect("fields");
		QueryCompiler::new(&index, fields)
	}

	#[test]
	fn plan_without_category_is_text_clause_alone() {
		let plan = QueryPlan::from_request(&SearchRequest::new("rust ownership", 5));
		assert_eq!(plan.clauses.len(), 1);
		assert_eq!(plan.clauses[0].occur, Occurrence::Must);
		assert_eq!(plan.text(), Some("rust ownership"));
		assert_eq!(plan.category(), None);
		assert_eq!(plan.limit, 5);
	}

	#[test]
	fn plan_weights_title_over_tags_over_body() {
		let plan = QueryPlan::from_request(&SearchRequest::new("rust", 5));
		let Clause::Text { fields, .. } = &plan.clauses[0].clause else { panic!("expected text clause") };
		let weight = |f: TextField| fields.iter().find(|(field, _)| *field == f).map(|(_, w)| *w).expect("weighted");
		assert!(weight(TextField::Title) > weight(TextField::Tags));
		assert!(weight(TextField::Tags) > weight(TextField::Body));
	}

	#[test]
	fn category_becomes_filter_clause() {
		let plan = QueryPlan::from_request(&SearchRequest::new("rust", 5).with_category("programming"));
		assert_eq!(plan.clauses.len(), 2);
		assert_eq!(plan.clauses[1].occur, Occurrence::Filter);
		assert_eq!(plan.category(), Some("programming"));
	}

	#[test]
	fn compile_keeps_plan_and_text_query() {
		let compiled = compiler().compile(&SearchRequest::new("kotlin", 3).with_category("lang").with_highlight(true)).expect("compile");
		assert!(compiled.plan.highlight);
		assert_eq!(compiled.plan.category(), Some("lang"));
	}

	#[test]
	fn malformed_syntax_is_query_syntax_error() {
		let err = compiler().compile(&SearchRequest::new("(kotlin", 10)).err().expect("must fail");
		assert!(matches!(&err, Error::QuerySyntax { query, .. } if query == "(kotlin"));
		assert!(err.is_client_error());
	}
}
