//! SQLite-backed canonical store.
//!
//! Tags and metadata are stored as JSON text, timestamps as RFC 3339.
//! Listing follows insertion order.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::DocumentStore;
use docsearch_core::types::{CanonicalDocument, DocumentId, DocumentPatch, Meta};

const COLUMNS: &str = "id, title, body, category, tags, metadata, created_at, updated_at";

pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    /// Connects to `url` (`sqlite://path/to/file.db`), creating the file and
    /// its parent directory when missing, and ensures the schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        if let Some(parent) = database_path(url).as_deref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::StoreUnavailable(format!("creating {}: {}", parent.display(), e)))?;
            }
        }
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::InvalidConfig(format!("store url '{}': {}", url, e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(store_error)?;
        let store = Self { db };
        store.init().await?;
        tracing::info!(url, "document store opened");
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                category TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#,
        )
        .execute(&self.db)
        .await
        .map_err(store_error)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category)")
            .execute(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }

}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create(&self, doc: CanonicalDocument) -> Result<CanonicalDocument> {
        sqlx::query(
            "INSERT INTO documents (id, title, body, category, tags, metadata, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(doc.id.to_string())
        .bind(&doc.title)
        .bind(&doc.body)
        .bind(doc.category.as_deref())
        .bind(to_json(&doc.tags)?)
        .bind(to_json(&doc.metadata)?)
        .bind(doc.created_at.to_rfc3339())
        .bind(doc.updated_at.to_rfc3339())
        .execute(&self.db)
        .await
        .map_err(store_error)?;
        Ok(doc)
    }

    async fn get(&self, id: &DocumentId) -> Result<Option<CanonicalDocument>> {
        let row = sqlx::query(&format!("SELECT {} FROM documents WHERE id = ?", COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await
            .map_err(store_error)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<CanonicalDocument>> {
        let rows = sqlx::query(&format!("SELECT {} FROM documents ORDER BY seq LIMIT ? OFFSET ?", COLUMNS))
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.db)
            .await
            .map_err(store_error)?;
        rows.iter().map(row_to_document).collect()
    }

    async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<CanonicalDocument>> {
        let rows = sqlx::query(&format!("SELECT {} FROM documents WHERE category = ? ORDER BY seq LIMIT ?", COLUMNS))
            .bind(category)
            .bind(to_i64(limit))
            .fetch_all(&self.db)
            .await
            .map_err(store_error)?;
        rows.iter().map(row_to_document).collect()
    }

    async fn list_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<CanonicalDocument>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let mut sql = format!("SELECT {} FROM documents", COLUMNS);
        for (i, _) in tags.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str("EXISTS (SELECT 1 FROM json_each(documents.tags) WHERE json_each.value = ?)");
        }
        sql.push_str(" ORDER BY seq LIMIT ?");
        let mut query = sqlx::query(&sql);
        for tag in tags {
            query = query.bind(tag.as_str());
        }
        let rows = query.bind(to_i64(limit)).fetch_all(&self.db).await.map_err(store_error)?;
        rows.iter().map(row_to_document).collect()
    }

    async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<Option<CanonicalDocument>> {
        let mut tx = self.db.begin().await.map_err(store_error)?;
        let row = sqlx::query(&format!("SELECT {} FROM documents WHERE id = ?", COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut doc = row_to_document(&row)?;
        doc.apply(patch);
        sqlx::query(
            "UPDATE documents SET title = ?, body = ?, category = ?, tags = ?, metadata = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&doc.title)
        .bind(&doc.body)
        .bind(doc.category.as_deref())
        .bind(to_json(&doc.tags)?)
        .bind(to_json(&doc.metadata)?)
        .bind(doc.updated_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;
        Ok(Some(doc))
    }

    async fn delete(&self, id: &DocumentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.db)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(count.max(0) as u64)
    }

    async fn close(&self) -> Result<()> {
        self.db.close().await;
        tracing::info!("document store closed");
        Ok(())
    }
}

fn row_to_document(row: &SqliteRow) -> Result<CanonicalDocument> {
    let id: String = row.try_get("id").map_err(store_error)?;
    let tags: String = row.try_get("tags").map_err(store_error)?;
    let metadata: String = row.try_get("metadata").map_err(store_error)?;
    let created_at: String = row.try_get("created_at").map_err(store_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(store_error)?;
    Ok(CanonicalDocument {
        id: DocumentId::parse(&id).map_err(|_| corrupt("id", &id))?,
        title: row.try_get("title").map_err(store_error)?,
        body: row.try_get("body").map_err(store_error)?,
        category: row.try_get("category").map_err(store_error)?,
        tags: serde_json::from_str::<Vec<String>>(&tags).map_err(|_| corrupt("tags", &id))?,
        metadata: serde_json::from_str::<Meta>(&metadata).map_err(|_| corrupt("metadata", &id))?,
        created_at: parse_timestamp(&created_at).ok_or_else(|| corrupt("created_at", &id))?,
        updated_at: parse_timestamp(&updated_at).ok_or_else(|| corrupt("updated_at", &id))?,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Operation(format!("encoding column: {}", e)))
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn corrupt(column: &str, id: &str) -> Error {
    Error::StoreUnavailable(format!("unreadable {} for document {}", column, id))
}

fn store_error(err: sqlx::Error) -> Error {
    Error::StoreUnavailable(err.to_string())
}

/// Filesystem path behind a `sqlite:` URL, if it names a file.
fn database_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_strips_scheme_and_params() {
        assert_eq!(database_path("sqlite://./data/docs.db"), Some(PathBuf::from("./data/docs.db")));
        assert_eq!(database_path("sqlite:/tmp/docs.db?mode=rwc"), Some(PathBuf::from("/tmp/docs.db")));
        assert_eq!(database_path("sqlite::memory:"), None);
        assert_eq!(database_path("memory"), None);
    }
}
