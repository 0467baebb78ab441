//! Canonical document store adapters.
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use docsearch_core::config::StoreSettings;
use docsearch_core::error::{Error, Result};
use docsearch_core::traits::DocumentStore;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Builds the store `settings.url` names: `memory` or a `sqlite:` URL.
pub async fn open_store(settings: &StoreSettings) -> Result<Arc<dyn DocumentStore>> {
    let url = settings.url.trim();
    if url == "memory" {
        tracing::info!("using in-memory document store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    if url.starts_with("sqlite:") {
        let store = SqliteStore::connect(url, settings.max_connections).await?;
        return Ok(Arc::new(store));
    }
    Err(Error::InvalidConfig(format!("unsupported store url '{}'", settings.url)))
}
