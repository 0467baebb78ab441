//! Domain types shared by the store, the text index and the service layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

pub type Meta = HashMap<String, String>;

/// Opaque, globally unique identity of a canonical document.
///
/// Rendered as a hyphenated UUID. Once assigned it never changes, and the
/// text index uses its string form as the mutation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| Error::InvalidIdentifier(raw.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Caller-supplied fields for a new document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Meta,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Meta>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.metadata.is_none()
    }
}

/// The authoritative record owned by the canonical store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDocument {
    pub id: DocumentId,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Meta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalDocument {
    pub fn new(draft: DocumentDraft) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::generate(),
            title: draft.title,
            body: draft.body,
            category: draft.category,
            tags: dedup_tags(draft.tags),
            metadata: draft.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `patch` and bumps `updated_at`, even when the patch is empty.
    pub fn apply(&mut self, patch: DocumentPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(body) = patch.body {
            self.body = body;
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(tags) = patch.tags {
            self.tags = dedup_tags(tags);
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
        self.updated_at = Utc::now();
    }
}

/// Tags behave as a set for matching; keep the first occurrence of each.
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// A free-text search with optional structured filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    pub limit: usize,
    #[serde(default)]
    pub highlight: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self { query: query.into(), category: None, limit, highlight: false }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }
}

/// One ranked match, built from the stored fields of the index record.
///
/// `score` is higher-is-better. Highlighted fields are `None` when the field
/// had no matching span, which is distinct from an empty fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub score: f32,
    pub highlighted_title: Option<String>,
    pub highlighted_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    /// All matches for the query, independent of the requested limit.
    pub total_hits: u64,
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_round_trips_through_display() {
        let id = DocumentId::generate();
        let parsed = DocumentId::parse(&id.to_string()).expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn malformed_id_is_invalid_identifier() {
        let err = DocumentId::parse("not-a-uuid").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(raw) if raw == "not-a-uuid"));
    }

    #[test]
    fn new_document_dedups_tags_in_order() {
        let doc = CanonicalDocument::new(DocumentDraft {
            title: "t".into(),
            body: "b".into(),
            tags: vec!["rust".into(), "search".into(), "rust".into()],
            ..Default::default()
        });
        assert_eq!(doc.tags, vec!["rust".to_string(), "search".to_string()]);
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut doc = CanonicalDocument::new(DocumentDraft {
            title: "Original".into(),
            body: "Body".into(),
            category: Some("test".into()),
            ..Default::default()
        });
        let created = doc.created_at;
        doc.apply(DocumentPatch { title: Some("Updated".into()), ..Default::default() });
        assert_eq!(doc.title, "Updated");
        assert_eq!(doc.body, "Body");
        assert_eq!(doc.category.as_deref(), Some("test"));
        assert_eq!(doc.created_at, created);
        assert!(doc.updated_at >= created);
    }
}
