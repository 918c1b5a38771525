//! End-to-end scenarios exercising `Store` as an external caller would,
//! rather than through its own inline unit tests.

use tempfile::tempdir;
use vectorstore::{ChunkingOptions, Store};

#[tokio::test]
async fn smoke_ingest_and_search_ranks_the_relevant_document_first() {
    let dir = tempdir().unwrap();
    let store = Store::create(dir.path().join("store")).await.unwrap();

    store
        .add_text(
            "policy",
            "Our login and security policy requires two-factor authentication for every employee account.",
            serde_json::json!({"category": "policy"}),
        )
        .await
        .unwrap();
    store
        .add_text(
            "menu",
            "The cafeteria menu changes every Monday and Thursday, with a new soup each week.",
            serde_json::json!({"category": "facilities"}),
        )
        .await
        .unwrap();
    store
        .add_text(
            "onboarding",
            "New hires complete a security training covering login hygiene and phishing awareness.",
            serde_json::json!({"category": "policy"}),
        )
        .await
        .unwrap();

    let results = store.search_text("login and security", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].score > 0.5, "expected a strong match, got {}", results[0].score);
    assert!(results[0].content.to_lowercase().contains("login") || results[0].content.to_lowercase().contains("security"));
}

#[tokio::test]
async fn data_survives_a_close_and_reopen_cycle() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let ids = {
        let store = Store::create(&root).await.unwrap();
        store.add_text("doc", "content that must survive a restart", serde_json::json!({})).await.unwrap()
    };

    let reopened = Store::open(&root).await.unwrap();
    for id in &ids {
        assert!(reopened.get(id).await.unwrap().is_some());
    }
    let results = reopened.search_text("content that must survive", 1).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn a_corrupted_index_file_is_recovered_by_rebuilding_from_records() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let ids = {
        let store = Store::create(&root).await.unwrap();
        store.add_text("doc", "recoverable content", serde_json::json!({})).await.unwrap()
    };

    std::fs::write(root.join("vector_index.bin"), b"corrupted data").unwrap();

    let reopened = Store::open(&root).await.unwrap();
    assert_eq!(reopened.all_ids().len(), ids.len());
    let results = reopened.search_text("recoverable content", 1).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn a_truncated_record_file_is_skipped_rather_than_failing_search() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let store = Store::create(&root).await.unwrap();
    let ids = store.add_text("doc", "a record that will be truncated on disk", serde_json::json!({})).await.unwrap();
    let id = &ids[0];

    let record_path = root.join("documents").join(format!("{}.json", id.replace('#', "_")));
    let original = std::fs::read_to_string(&record_path).unwrap();
    std::fs::write(&record_path, &original[..original.len() / 2]).unwrap();

    let results = store.search_text("truncated on disk", 5).await.unwrap();
    assert!(results.is_empty(), "a truncated record should be skipped, not surfaced");
}

#[tokio::test]
async fn chunking_is_deterministic_for_a_fixed_input_and_options() {
    let dir = tempdir().unwrap();
    let store = Store::create(dir.path().join("store")).await.unwrap();
    let text = "This is a test sentence. ".repeat(50);

    let first = store.add_text("run-1", &text, serde_json::json!({})).await.unwrap();
    let second = store.add_text("run-2", &text, serde_json::json!({})).await.unwrap();
    assert_eq!(first.len(), second.len());
}

#[tokio::test]
async fn create_rejects_a_nonempty_directory_and_open_rejects_a_missing_one() {
    let dir = tempdir().unwrap();
    let existing = dir.path().join("occupied");
    std::fs::create_dir_all(&existing).unwrap();
    std::fs::write(existing.join("file"), b"x").unwrap();
    assert!(Store::create(&existing).await.is_err());

    assert!(Store::open(dir.path().join("nowhere")).await.is_err());
}

#[tokio::test]
async fn delete_removes_the_store_directory_entirely() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    Store::create(&root).await.unwrap();
    assert!(root.is_dir());
    Store::delete(&root).unwrap();
    assert!(!root.exists());
}

#[tokio::test]
async fn custom_chunking_options_are_honored_by_add_text() {
    let dir = tempdir().unwrap();
    let store = Store::create(dir.path().join("store")).await.unwrap();
    let _ = ChunkingOptions::default();
    let ids = store
        .add_text("doc", "Short enough to stay a single chunk.", serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(ids.len(), 1);
}
