use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use docsearch_core::config::SearchSettings;
use docsearch_store::MemoryStore;
use docsearch_sync::DocumentService;
use docsearch_text::TextIndex;
use docsearch_server::{create_router, AppState};

fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let index = Arc::new(TextIndex::in_memory(15_000_000).expect("index"));
    let search = SearchSettings { max_limit: 5, ..Default::default() };
    create_router(AppState::new(DocumentService::new(store, index), search))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, value)
}

async fn create(app: &Router, title: &str, content: &str, category: Option<&str>) -> Value {
    let (status, body) = send(app, "POST", "/documents", Some(json!({ "title": title, "content": content, "category": category }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn health_reports_store_and_index_counts() {
    let app = app();
    create(&app, "Health", "check", None).await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["documentsCount"], 1);
    assert_eq!(body["indexedDocuments"], 1);
}

#[tokio::test]
async fn document_crud_round_trip() {
    let app = app();
    let created = create(&app, "Kotlin coroutines", "Structured concurrency", Some("programming")).await;
    let id = created["id"].as_str().expect("id").to_string();
    assert_eq!(created["content"], "Structured concurrency");
    assert_eq!(created["tags"], json!([]));
    assert!(created["createdAt"].as_str().is_some_and(|t| t.ends_with('Z')));

    let (status, fetched) = send(&app, "GET", &format!("/documents/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Kotlin coroutines");

    let (status, updated) = send(&app, "PUT", &format!("/documents/{}", id), Some(json!({ "title": "Rust async" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Rust async");
    assert_eq!(updated["content"], "Structured concurrency");

    let (_, listed) = send(&app, "GET", "/documents?category=programming", None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, "DELETE", &format!("/documents/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "GET", &format!("/documents/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document not found");
}

#[tokio::test]
async fn malformed_and_unknown_ids_are_404() {
    let app = app();
    for (method, body) in [("GET", None), ("PUT", Some(json!({ "title": "x" }))), ("DELETE", None)] {
        let (status, _) = send(&app, method, "/documents/not-a-uuid", body.clone()).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} malformed", method);
        let (status, _) = send(&app, method, "/documents/00000000-0000-4000-8000-000000000000", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} unknown", method);
    }
}

#[tokio::test]
async fn list_paginates_with_skip_and_limit() {
    let app = app();
    for title in ["one", "two", "three"] {
        create(&app, title, "paged", None).await;
    }
    let (_, page) = send(&app, "GET", "/documents?limit=1&skip=1", None).await;
    assert_eq!(page[0]["title"], "two");
    let (_, all) = send(&app, "GET", "/documents?limit=oops", None).await;
    assert_eq!(all.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn search_get_filters_highlights_and_clamps_limit() {
    let app = app();
    for i in 0..7 {
        create(&app, &format!("Programming topic {}", i), "notes", Some("programming")).await;
    }

    let (status, body) = send(&app, "GET", "/search?q=programming&limit=50", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalHits"], 7);
    assert_eq!(body["results"].as_array().map(Vec::len), Some(5), "limit is clamped to max_limit");
    assert_eq!(body["query"], "programming");
    assert!(body["results"][0].get("highlightedTitle").is_none());

    let (_, filtered) = send(&app, "GET", "/search?q=programming&category=science", None).await;
    assert_eq!(filtered["totalHits"], 0);

    let (_, highlighted) = send(&app, "GET", "/search?q=programming&highlight=TRUE&limit=1", None).await;
    let title = highlighted["results"][0]["highlightedTitle"].as_str().expect("highlighted title");
    assert!(title.contains("<mark>Programming</mark>"));
    assert!(highlighted["results"][0].get("highlightedContent").is_none());

    let (_, not_true) = send(&app, "GET", "/search?q=programming&highlight=yes&limit=1", None).await;
    assert!(not_true["results"][0].get("highlightedTitle").is_none());
}

#[tokio::test]
async fn search_post_accepts_json_body() {
    let app = app();
    create(&app, "Tantivy segments", "merge policy", Some("search")).await;
    let (status, body) = send(&app, "POST", "/search", Some(json!({ "query": "merge", "category": "search", "highlight": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalHits"], 1);
    assert!(body["results"][0]["highlightedContent"].as_str().is_some_and(|c| c.contains("<mark>merge</mark>")));
    assert_eq!(body["results"][0]["tags"], json!([]));
}

#[tokio::test]
async fn search_errors_are_client_errors() {
    let app = app();
    let (status, body) = send(&app, "GET", "/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing query parameter 'q'");

    let (status, body) = send(&app, "POST", "/search", Some(json!({ "query": "(kotlin" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["query"], "(kotlin");
}
