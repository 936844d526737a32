#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// CLI command functions sharing one base directory across invocations
// Run with: cargo test --test integration_commands

use documind::commands::{ask, ingest_documents, show_history, upload_files};
use documind::config::Config;
use documind::embeddings::EmbeddingBackendKind;
use documind::generation::GenerationOptions;
use documind::session::{ResponseCache, Session};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn session_persists_between_commands() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let base_dir = temp_dir.path().join("home");
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Every Tuesday." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::new(&base_dir);
    config.embedding.backend = EmbeddingBackendKind::Tfidf;
    config.generation.endpoint = format!("{}/v1/chat/completions", server.uri());
    config.generation.cache_capacity = 4;
    config.save().expect("config should save");

    let source = temp_dir.path().join("schedule.txt");
    fs::write(&source, "The recycling truck comes every Tuesday. Bins go out at night.")
        .expect("should write source file");

    upload_files(&base_dir, &[source]).await.expect("upload");
    ingest_documents(&base_dir, None).await.expect("ingest");

    let after_ingest = Session::load_or_new(&config.session_path(), ResponseCache::new(4))
        .expect("session file should load");
    assert!(after_ingest.documents_processed());
    assert_eq!(
        after_ingest.processed_files(),
        ["documents/schedule.txt".to_string()]
    );
    assert!(after_ingest.history().is_empty());

    // The second run is answered from the saved cache
    for _ in 0..2 {
        ask(
            &base_dir,
            "When is recycling collected?",
            2,
            GenerationOptions::default(),
        )
        .await
        .expect("ask");
    }

    let session = Session::load_or_new(&config.session_path(), ResponseCache::new(4))
        .expect("session file should load");
    assert_eq!(session.id(), after_ingest.id());
    assert_eq!(session.history().len(), 2);
    let newest = session.recent_history().next().expect("history entry");
    assert_eq!(newest.task, "Question: When is recycling collected?");
    assert_eq!(newest.result, "Every Tuesday.");
    assert_eq!(session.cache().len(), 1);

    show_history(&base_dir, false).expect("history view");
    show_history(&base_dir, true).expect("history clear");
    assert!(!config.session_path().exists());
}
