use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use docsearch_core::config::SearchSettings;
use docsearch_sync::DocumentService;

use super::handlers::*;

/// Application state shared across all handlers
pub struct AppState {
    pub service: DocumentService,
    pub search: SearchSettings,
}

impl AppState {
    pub fn new(service: DocumentService, search: SearchSettings) -> Self {
        Self { service, search }
    }
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Document CRUD
        .route("/documents", post(create_document).get(list_documents))
        .route("/documents/:id", get(get_document).put(update_document).delete(delete_document))
        // Search
        .route("/search", get(search_get).post(search_post))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
