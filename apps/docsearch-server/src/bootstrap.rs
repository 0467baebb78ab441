use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use docsearch_core::config::Settings;
use docsearch_store::open_store;
use docsearch_sync::DocumentService;
use docsearch_text::TextIndex;

/// Everything a process needs, built once at startup and handed out by
/// reference.
pub struct Services {
    pub service: DocumentService,
    pub index: Arc<TextIndex>,
}

impl Services {
    pub async fn open(settings: &Settings) -> Result<Self> {
        let store = open_store(&settings.store)
            .await
            .with_context(|| format!("opening document store {}", settings.store.url))?;
        let index_settings = settings.clone();
        let index = tokio::task::spawn_blocking(move || TextIndex::open(&index_settings))
            .await
            .context("index open task")?
            .with_context(|| format!("opening search index {}", settings.index.path))?;
        let index = Arc::new(index);
        info!(
            in_memory = settings.index.in_memory,
            path = %settings.index.path,
            store = %settings.store.url,
            "services ready"
        );
        Ok(Self { service: DocumentService::new(store, index.clone()), index })
    }

    /// Waits for index merges, releases the writer lock, then closes the
    /// store's connections.
    pub async fn close(&self) -> Result<()> {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.close()).await.context("index close task")??;
        info!("search index closed");
        self.service.close().await.context("closing document store")?;
        Ok(())
    }
}
