use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use docsearch_core::error::Error;
use docsearch_core::types::SearchRequest;

use super::router::AppState;
use super::types::*;

const DEFAULT_LIST_LIMIT: usize = 100;

/// Error wrapper for API handlers
pub enum ApiError {
    Domain(Error),
    BadRequest(String),
    NotFound,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Domain(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Domain(Error::QuerySyntax { query, reason }) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse { error: format!("Malformed query: {}", reason), query: Some(query) },
            ),
            ApiError::Domain(Error::NotFound(_) | Error::InvalidIdentifier(_)) | ApiError::NotFound => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("Document not found"))
            }
            ApiError::Domain(e @ (Error::IndexUnavailable(_) | Error::StoreUnavailable(_) | Error::WriterLocked(_))) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::SERVICE_UNAVAILABLE, ErrorResponse::new(e.to_string()))
            }
            ApiError::Domain(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(e.to_string()))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Full-text document search API" }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let documents_count = state.service.count().await?;
    let indexed_documents = state.service.indexed_count().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        service: "docsearch".to_string(),
        documents_count,
        indexed_documents,
    }))
}

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.service.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse::from(created))))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = parse_number(params.limit.as_deref()).unwrap_or(DEFAULT_LIST_LIMIT);
    let skip = parse_number(params.skip.as_deref()).unwrap_or(0);
    let documents = if let Some(category) = params.category {
        state.service.list_by_category(&category, limit).await?
    } else if let Some(tags) = params.tags {
        let tags: Vec<String> = tags.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect();
        state.service.list_by_tags(&tags, limit).await?
    } else {
        state.service.list(limit, skip).await?
    };
    Ok(Json(documents.into_iter().map(DocumentResponse::from).collect::<Vec<_>>()))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service.get(&id).await? {
        Some(doc) => Ok(Json(DocumentResponse::from(doc))),
        None => Err(ApiError::NotFound),
    }
}

pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DocumentUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service.update(&id, req.into()).await? {
        Some(doc) => Ok(Json(DocumentResponse::from(doc))),
        None => Err(ApiError::NotFound),
    }
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.service.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

pub async fn search_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.q.ok_or_else(|| ApiError::BadRequest("Missing query parameter 'q'".to_string()))?;
    let request = SearchRequest {
        query,
        category: params.category,
        limit: state.search.effective_limit(parse_number(params.limit.as_deref())),
        highlight: params.highlight.is_some_and(|h| h.eq_ignore_ascii_case("true")),
    };
    run_search(&state, request).await
}

pub async fn search_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = SearchRequest {
        query: body.query,
        category: body.category,
        limit: state.search.effective_limit(body.limit),
        highlight: body.highlight,
    };
    run_search(&state, request).await
}

async fn run_search(state: &AppState, request: SearchRequest) -> Result<Json<SearchResponse>, ApiError> {
    let results = state.service.search(request).await?;
    Ok(Json(SearchResponse::from(results)))
}

fn parse_number(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
}
