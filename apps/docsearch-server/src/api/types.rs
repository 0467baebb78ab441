use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use docsearch_core::types::{CanonicalDocument, DocumentDraft, DocumentPatch, Meta, SearchHit, SearchResults};

/// Body of `POST /documents`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Meta,
}

impl From<DocumentRequest> for DocumentDraft {
    fn from(req: DocumentRequest) -> Self {
        DocumentDraft { title: req.title, body: req.content, category: req.category, tags: req.tags, metadata: req.metadata }
    }
}

/// Body of `PUT /documents/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Meta>,
}

impl From<DocumentUpdateRequest> for DocumentPatch {
    fn from(req: DocumentUpdateRequest) -> Self {
        DocumentPatch { title: req.title, body: req.content, category: req.category, tags: req.tags, metadata: req.metadata }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Meta,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CanonicalDocument> for DocumentResponse {
    fn from(doc: CanonicalDocument) -> Self {
        Self {
            id: doc.id.to_string(),
            title: doc.title,
            content: doc.body,
            category: doc.category,
            tags: doc.tags,
            metadata: doc.metadata,
            created_at: timestamp(doc.created_at),
            updated_at: timestamp(doc.updated_at),
        }
    }
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Query string of `GET /documents`. Unparseable numbers fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub skip: Option<String>,
    pub category: Option<String>,
    /// Comma-separated; every tag must be present.
    pub tags: Option<String>,
}

/// Query string of `GET /search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
    pub highlight: Option<String>,
}

/// Body of `POST /search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub highlight: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_content: Option<String>,
}

impl From<SearchHit> for SearchResultResponse {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.id,
            title: hit.title,
            content: hit.body,
            category: hit.category,
            tags: hit.tags,
            score: hit.score,
            highlighted_title: hit.highlighted_title,
            highlighted_content: hit.highlighted_body,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultResponse>,
    pub total_hits: u64,
    pub query: String,
}

impl From<SearchResults> for SearchResponse {
    fn from(results: SearchResults) -> Self {
        Self {
            results: results.hits.into_iter().map(SearchResultResponse::from).collect(),
            total_hits: results.total_hits,
            query: results.query,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub documents_count: u64,
    pub indexed_documents: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), query: None }
    }
}
