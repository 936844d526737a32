use super::*;
use tempfile::TempDir;

#[test]
fn put_get_roundtrip_with_nested_keys() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = FsBlobStore::new(temp_dir.path());

    store
        .put("documents/reports/q1.txt", b"quarterly", "text/plain")
        .expect("put should succeed");

    assert_eq!(
        store.get("documents/reports/q1.txt").expect("get should succeed"),
        b"quarterly"
    );
    assert!(temp_dir.path().join("documents/reports/q1.txt").exists());
}

#[test]
fn list_filters_by_prefix_and_sorts() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = FsBlobStore::new(temp_dir.path());

    for key in ["documents/b.pdf", "documents/a.txt", "other/c.txt", "documents/sub/d.docx"] {
        store.put(key, b"x", "text/plain").expect("put should succeed");
    }

    assert_eq!(
        store.list("documents/").expect("list should succeed"),
        vec!["documents/a.txt", "documents/b.pdf", "documents/sub/d.docx"]
    );
    assert_eq!(store.list("").expect("list should succeed").len(), 4);
}

#[test]
fn list_documents_skips_unsupported_extensions() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = FsBlobStore::new(temp_dir.path());

    for key in ["documents/a.txt", "documents/image.png", "documents/notes", "documents/B.PDF"] {
        store.put(key, b"x", "application/octet-stream").expect("put should succeed");
    }

    assert_eq!(
        list_documents(&store, "documents/").expect("list should succeed"),
        vec!["documents/B.PDF", "documents/a.txt"]
    );
}

#[test]
fn missing_root_lists_nothing() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = FsBlobStore::new(temp_dir.path().join("does-not-exist"));
    assert!(store.list("").expect("list should succeed").is_empty());
}

#[test]
fn keys_cannot_escape_root() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = FsBlobStore::new(temp_dir.path().join("root"));

    for key in ["../outside.txt", "/etc/passwd", "a/../../b.txt", "", "a\\b.txt", "./a.txt"] {
        assert!(
            matches!(store.put(key, b"x", "text/plain"), Err(RagError::Blob(_))),
            "key {key:?} should be rejected"
        );
    }
}

#[test]
fn missing_blob_is_error() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = FsBlobStore::new(temp_dir.path());
    assert!(matches!(store.get("documents/none.txt"), Err(RagError::Blob(_))));
}
