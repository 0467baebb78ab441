use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

use docsearch_core::config::StoreSettings;
use docsearch_core::error::Error;
use docsearch_core::traits::DocumentStore;
use docsearch_core::types::{CanonicalDocument, DocumentDraft, DocumentId, DocumentPatch};
use docsearch_store::{open_store, MemoryStore, SqliteStore};

fn doc(title: &str, category: Option<&str>) -> CanonicalDocument {
    CanonicalDocument::new(DocumentDraft {
        title: title.to_string(),
        body: format!("{} body", title),
        category: category.map(str::to_string),
        tags: vec!["t1".to_string(), "t2".to_string()],
        metadata: HashMap::from([("source".to_string(), "test".to_string())]),
    })
}

async fn exercise_contract(store: &dyn DocumentStore) {
    let a = store.create(doc("Alpha", Some("greek"))).await.expect("create a");
    let b = store.create(doc("Bravo", None)).await.expect("create b");
    let c = store.create(doc("Charlie", Some("greek"))).await.expect("create c");
    assert_eq!(store.count().await.expect("count"), 3);

    let fetched = store.get(&a.id).await.expect("get").expect("present");
    assert_eq!(fetched, a);
    assert!(store.get(&DocumentId::generate()).await.expect("get").is_none());

    let page: Vec<String> = store.list(2, 1).await.expect("list").into_iter().map(|d| d.title).collect();
    assert_eq!(page, vec!["Bravo".to_string(), "Charlie".to_string()]);

    let greek = store.list_by_category("greek", 10).await.expect("by category");
    assert_eq!(greek.len(), 2);
    assert!(store.list_by_category("", 10).await.expect("by empty category").is_empty());

    let tagged = store.list_by_tags(&["t1".to_string(), "t2".to_string()], 10).await.expect("by tags");
    assert_eq!(tagged.len(), 3);
    assert!(store.list_by_tags(&["t1".to_string(), "missing".to_string()], 10).await.expect("by tags").is_empty());
    assert!(store.list_by_tags(&[], 10).await.expect("no tags").is_empty());

    let updated = store
        .update(&b.id, DocumentPatch { title: Some("Bravo two".into()), ..Default::default() })
        .await
        .expect("update")
        .expect("present");
    assert_eq!(updated.title, "Bravo two");
    assert_eq!(updated.body, b.body);
    assert_eq!(updated.created_at, b.created_at);
    assert!(updated.updated_at >= b.updated_at);
    assert_eq!(store.get(&b.id).await.expect("get").expect("present").title, "Bravo two");
    assert!(store.update(&DocumentId::generate(), DocumentPatch::default()).await.expect("update").is_none());

    assert!(store.delete(&c.id).await.expect("delete"));
    assert!(!store.delete(&c.id).await.expect("delete again"));
    assert_eq!(store.count().await.expect("count"), 2);
}

#[tokio::test]
async fn memory_store_contract() {
    exercise_contract(&MemoryStore::new()).await;
}

#[tokio::test]
async fn sqlite_store_contract() {
    let tmp = TempDir::new().expect("tempdir");
    let url = format!("sqlite://{}", tmp.path().join("nested/documents.db").display());
    let store = SqliteStore::connect(&url, 2).await.expect("connect");
    exercise_contract(&store).await;
    store.close().await.expect("close");
}

#[tokio::test]
async fn sqlite_store_survives_reconnect() {
    let tmp = TempDir::new().expect("tempdir");
    let url = format!("sqlite://{}", tmp.path().join("documents.db").display());
    let original = {
        let store = SqliteStore::connect(&url, 1).await.expect("connect");
        let created = store.create(doc("Persisted", Some("ops"))).await.expect("create");
        store.close().await.expect("close");
        created
    };
    let store = SqliteStore::connect(&url, 1).await.expect("reconnect");
    assert_eq!(store.get(&original.id).await.expect("get"), Some(original));
}

#[tokio::test]
async fn open_store_picks_backend_from_url() {
    let memory = open_store(&StoreSettings { url: "memory".into(), max_connections: 1 }).await.expect("memory");
    assert_eq!(memory.count().await.expect("count"), 0);

    let err = open_store(&StoreSettings { url: "postgres://nope".into(), max_connections: 1 }).await.err().expect("rejected");
    assert!(matches!(err, Error::InvalidConfig(_)));

    let shared: Arc<dyn DocumentStore> = memory;
    shared.create(doc("Shared", None)).await.expect("create");
    assert_eq!(shared.count().await.expect("count"), 1);
}

#[tokio::test]
async fn closed_sqlite_store_rejects_further_calls() {
    let tmp = TempDir::new().expect("tempdir");
    let url = format!("sqlite://{}", tmp.path().join("documents.db").display());
    let store = open_store(&StoreSettings { url, max_connections: 1 }).await.expect("sqlite");
    store.create(doc("Before close", None)).await.expect("create");

    store.close().await.expect("close");
    let err = store.count().await.err().expect("closed pool");
    assert!(matches!(err, Error::StoreUnavailable(_)));
}
