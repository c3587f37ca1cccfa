use code_chunker::{ChunkType, CodeChunk, IndexedChunk, chunk_id};
use tempfile::TempDir;
use vector_store::{StoreError, VectorStore};

fn row(path: &str, start: usize, hash: &str, vector: Vec<f32>) -> IndexedChunk {
    IndexedChunk::new(
        CodeChunk {
            id: chunk_id(path, start),
            file_path: path.to_string(),
            relative_path: path.trim_start_matches("/ws/").to_string(),
            file_hash: hash.to_string(),
            content: format!("// {path}:{start}"),
            start_line: start,
            end_line: start + 9,
            chunk_type: ChunkType::Block,
            language: "rs".into(),
            symbols: vec![],
        },
        vector,
    )
}

async fn open(dir: &TempDir) -> VectorStore {
    let mut store = VectorStore::new(dir.path().join(".semindex").join("index"));
    store.initialize().await.unwrap();
    store
}

#[tokio::test]
async fn fresh_store_is_empty_until_first_write() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir).await;
    assert!(store.is_ready());
    assert!(!store.has_index().await.unwrap());
    assert!(store.search(&[1.0, 0.0], 3).await.unwrap().is_empty());

    store.add_batch(&[row("/ws/a.rs", 1, "h1", vec![1.0, 0.0])]).await.unwrap();
    assert!(store.has_index().await.unwrap());
    let stats = store.get_stats().await.unwrap();
    assert_eq!(stats.chunk_count, 1);
    assert_eq!(stats.file_count, 1);
}

#[tokio::test]
async fn upsert_twice_keeps_one_copy() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir).await;
    let chunks = vec![
        row("/ws/a.rs", 1, "h1", vec![1.0, 0.0]),
        row("/ws/a.rs", 9, "h1", vec![0.5, 0.5]),
    ];
    store.upsert_file("/ws/a.rs", &chunks).await.unwrap();
    store.upsert_file("/ws/a.rs", &chunks).await.unwrap();
    assert_eq!(store.get_stats().await.unwrap().chunk_count, 2);
}

#[tokio::test]
async fn delete_file_removes_its_hash() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir).await;
    store
        .add_batch(&[
            row("/ws/a.rs", 1, "ha", vec![1.0, 0.0]),
            row("/ws/it's.rs", 1, "hb", vec![0.0, 1.0]),
        ])
        .await
        .unwrap();

    let hashes = store.get_file_hashes().await.unwrap();
    assert_eq!(hashes.get("/ws/a.rs").map(String::as_str), Some("ha"));
    assert_eq!(hashes.len(), 2);

    store.delete_file("/ws/it's.rs").await.unwrap();
    store.delete_file("/ws/never-indexed.rs").await.unwrap();
    let hashes = store.get_file_hashes().await.unwrap();
    assert!(!hashes.contains_key("/ws/it's.rs"));
    assert!(hashes.contains_key("/ws/a.rs"));
}

#[tokio::test]
async fn cosine_search_orders_best_first() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir).await;
    store
        .add_batch(&[
            row("/ws/x.rs", 1, "h", vec![1.0, 0.0]),
            row("/ws/y.rs", 1, "h", vec![0.0, 1.0]),
            row("/ws/z.rs", 1, "h", vec![0.9, 0.1]),
        ])
        .await
        .unwrap();

    let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.file_path, "/ws/x.rs");
    assert_eq!(hits[1].chunk.file_path, "/ws/z.rs");
    assert!(hits[0].score >= hits[1].score);
    // [0.9,0.1] is about 0.99 similar; [0,1] would score 0.
    assert!(hits[1].score > 0.5);
}

#[tokio::test]
async fn mismatched_dimension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir).await;
    store.add_batch(&[row("/ws/a.rs", 1, "h", vec![1.0, 0.0])]).await.unwrap();
    let err = store
        .add_batch(&[row("/ws/b.rs", 1, "h", vec![1.0, 0.0, 0.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, got: 3 }));
}

#[tokio::test]
async fn create_index_replaces_and_clear_empties() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir).await;
    store
        .add_batch(&[row("/ws/a.rs", 1, "h", vec![1.0, 0.0])])
        .await
        .unwrap();
    store
        .create_index(&[
            row("/ws/b.rs", 1, "h", vec![0.0, 1.0, 0.0]),
            row("/ws/c.rs", 1, "h", vec![0.0, 0.0, 1.0]),
        ])
        .await
        .unwrap();
    let hashes = store.get_file_hashes().await.unwrap();
    assert!(!hashes.contains_key("/ws/a.rs"));
    assert_eq!(store.get_stats().await.unwrap().chunk_count, 2);

    store.clear().await.unwrap();
    assert!(!store.has_index().await.unwrap());
    store.clear().await.unwrap();
}

#[tokio::test]
async fn rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = open(&dir).await;
        store
            .add_batch(&[row("/ws/a.rs", 1, "h", vec![1.0, 0.0])])
            .await
            .unwrap();
        store.close();
        store.close();
        assert!(!store.is_ready());
    }
    let store = open(&dir).await;
    assert!(store.has_index().await.unwrap());
    assert!(matches!(
        store.search(&[1.0], 1).await,
        Err(StoreError::DimensionMismatch { expected: 2, got: 1 })
    ));
}

#[tokio::test]
async fn disabled_store_is_inert() {
    let mut store = VectorStore::new("/unused");
    assert!(!store.is_ready());
    assert!(!store.has_index().await.unwrap());
    assert!(store.get_file_hashes().await.unwrap().is_empty());
    store.add_batch(&[row("/ws/a.rs", 1, "h", vec![1.0])]).await.unwrap();
    assert!(store.search(&[1.0], 5).await.unwrap().is_empty());
    assert_eq!(store.get_stats().await.unwrap().chunk_count, 0);
}

#[tokio::test]
async fn unopenable_path_leaves_store_disabled() {
    let dir = TempDir::new().unwrap();
    // A regular file where the index directory should be.
    let blocker = dir.path().join(".semindex");
    std::fs::write(&blocker, "not a directory").unwrap();

    let mut store = VectorStore::new(blocker.join("index"));
    let err = store.initialize().await.unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }), "{err}");
    assert!(!store.is_ready());
    assert!(!store.has_index().await.unwrap());
    store.add_batch(&[row("/ws/a.rs", 1, "h", vec![1.0])]).await.unwrap();
    assert_eq!(store.get_stats().await.unwrap().chunk_count, 0);
}
