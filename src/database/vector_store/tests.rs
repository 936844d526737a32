use super::*;
use tempfile::TempDir;

async fn create_test_store() -> (TempDir, VectorStore) {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let database = Database::initialize_from_config_dir(temp_dir.path(), "store.db")
        .await
        .expect("should open database");
    (temp_dir, VectorStore::new(database))
}

fn chunks(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| (*t).to_string()).collect()
}

#[test]
fn cosine_bounds_and_self_similarity() {
    let a = [0.3, -1.2, 4.0];
    assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);

    let negated: Vec<f32> = a.iter().map(|v| -v).collect();
    assert!((cosine_similarity(&a, &negated) + 1.0).abs() < 1e-6);

    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);

    let big = [1e20_f32, 1e20];
    let sim = cosine_similarity(&big, &[1.0, 1.0]);
    assert!((-1.0..=1.0).contains(&sim));
}

#[tokio::test]
async fn empty_store_is_not_ready() {
    let (_dir, store) = create_test_store().await;

    assert!(!store.is_ready(EmbeddingBackendKind::Remote).await.expect("is_ready"));
    assert!(!store.is_ready(EmbeddingBackendKind::Tfidf).await.expect("is_ready"));
    assert!(matches!(
        store.query(&[1.0], 3).await,
        Err(RagError::StoreNotInitialized)
    ));
    assert!(store.recent(3).await.expect("recent").is_empty());
    assert_eq!(store.sample_chunk().await.expect("sample"), None);
}

#[tokio::test]
async fn query_orders_by_similarity_with_stable_ties() {
    let (_dir, store) = create_test_store().await;
    let texts = chunks(&["east", "north", "also east", "north-east"]);
    let vectors = vec![
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![2.0, 0.0],
        vec![1.0, 1.0],
    ];
    store
        .replace_all(&texts, &vectors, None)
        .await
        .expect("replace_all should succeed");

    let results = store.query(&[1.0, 0.0], 3).await.expect("query");
    let order: Vec<&str> = results.iter().map(|r| r.chunk.as_str()).collect();
    assert_eq!(order, vec!["east", "also east", "north-east"]);
    assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));

    let everything = store.query(&[1.0, 0.0], 10).await.expect("query");
    assert_eq!(everything.len(), 4);

    let none = store.query(&[1.0, 0.0], 0).await.expect("query");
    assert!(none.is_empty());
}

#[tokio::test]
async fn query_dimension_mismatch() {
    let (_dir, store) = create_test_store().await;
    store
        .replace_all(&chunks(&["a"]), &[vec![1.0, 0.0, 0.0]], None)
        .await
        .expect("replace_all should succeed");

    assert!(matches!(
        store.query(&[1.0, 0.0], 1).await,
        Err(RagError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn query_skips_rows_with_foreign_dimension() {
    let (_dir, store) = create_test_store().await;
    store
        .replace_all(&chunks(&["good", "other"]), &[vec![1.0, 0.0], vec![0.0, 1.0]], None)
        .await
        .expect("replace_all should succeed");

    sqlx::query("INSERT INTO embeddings (chunk, embedding) VALUES ('stray', '[1.0, 0.0, 0.0]')")
        .execute(store.database().pool())
        .await
        .expect("should insert stray row");

    let results = store.query(&[1.0, 0.0], 10).await.expect("query");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.chunk != "stray"));
}

#[tokio::test]
async fn replace_all_replaces_previous_corpus() {
    let (_dir, store) = create_test_store().await;
    store
        .replace_all(&chunks(&["old one", "old two"]), &[vec![1.0], vec![2.0]], None)
        .await
        .expect("first replace");
    store
        .replace_all(&chunks(&["new"]), &[vec![3.0]], None)
        .await
        .expect("second replace");

    assert_eq!(store.count().await.expect("count"), 1);
    let results = store.query(&[1.0], 10).await.expect("query");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk, "new");
}

#[tokio::test]
async fn replace_all_validates_input() {
    let (_dir, store) = create_test_store().await;

    assert!(matches!(
        store.replace_all(&chunks(&["a", "b"]), &[vec![1.0]], None).await,
        Err(RagError::Embedding(_))
    ));
    assert!(matches!(
        store.replace_all(&[], &[], None).await,
        Err(RagError::NoContent)
    ));
    assert!(matches!(
        store
            .replace_all(&chunks(&["a", "b"]), &[vec![1.0], vec![1.0, 2.0]], None)
            .await,
        Err(RagError::DimensionMismatch { .. })
    ));

    // Failed validation leaves the store untouched
    assert_eq!(store.count().await.expect("count"), 0);
}

#[tokio::test]
async fn recent_returns_newest_first() {
    let (_dir, store) = create_test_store().await;
    store
        .replace_all(
            &chunks(&["c1", "c2", "c3", "c4", "c5"]),
            &[vec![1.0], vec![1.0], vec![1.0], vec![1.0], vec![1.0]],
            None,
        )
        .await
        .expect("replace_all should succeed");

    assert_eq!(store.recent(3).await.expect("recent"), chunks(&["c5", "c4", "c3"]));
    assert_eq!(store.recent(10).await.expect("recent").len(), 5);
    assert_eq!(store.sample_chunk().await.expect("sample"), Some("c1".to_string()));
}

#[tokio::test]
async fn vectorizer_state_follows_backend() {
    let (_dir, store) = create_test_store().await;
    let vectorizer = TfidfVectorizer::fitted(10, &["alpha beta gamma"]).expect("fit");
    let texts = chunks(&["alpha beta gamma"]);
    let vectors = vec![vectorizer.transform(&texts[0]).expect("transform")];

    store
        .replace_all(&texts, &vectors, Some(&vectorizer))
        .await
        .expect("replace_all should succeed");
    assert!(store.is_ready(EmbeddingBackendKind::Tfidf).await.expect("is_ready"));
    assert_eq!(
        store.load_vectorizer().await.expect("load"),
        Some(vectorizer)
    );

    // Sparse rows are never offered to dense queries
    assert!(!store.is_ready(EmbeddingBackendKind::Remote).await.expect("is_ready"));

    store
        .replace_all(&texts, &[vec![0.5, 0.5]], None)
        .await
        .expect("replace_all should succeed");
    assert!(!store.is_ready(EmbeddingBackendKind::Tfidf).await.expect("is_ready"));
    assert!(store.is_ready(EmbeddingBackendKind::Remote).await.expect("is_ready"));
    assert_eq!(store.load_vectorizer().await.expect("load"), None);
}
