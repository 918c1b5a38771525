//! `Store`: the crate's public entry point, orchestrating the index, cache,
//! embedder, and extractor dispatch behind a directory-backed lifecycle
//! (§5). Grounded in the teacher's `CodebaseIndex::{open,refresh,search}`
//! shape — cache-dir creation, a compatibility check that triggers a
//! rebuild, and `ignore::WalkBuilder`-driven directory enumeration.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::Stream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cache::EmbeddingCache;
use crate::chunk::{assemble_chunks, detect_boundaries, ChunkingOptions, DocumentKind};
use crate::config::{embedding_cache_dir, StoreConfig};
use crate::embedder::{Embedder, EmbeddingBackend, HashingEmbedder};
use crate::error::{Result, VectorStoreError};
use crate::extract::ExtractorRegistry;
use crate::index::VectorIndex;
use crate::record::{ChunkRecord, SearchResult};
use crate::similarity;

#[cfg(feature = "model2vec")]
use crate::embedder::{Model2VecBackend, ModelManager};

/// Summary counters for a store, returned by [`Store::stats`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub document_count: usize,
    pub embedding_dimension: usize,
    pub model_id: String,
}

/// A local, file-based semantic search store rooted at a single directory.
pub struct Store {
    root: PathBuf,
    config: StoreConfig,
    index: Arc<VectorIndex>,
    embedder: Arc<Embedder>,
    extractors: ExtractorRegistry,
}

impl Store {
    /// Create a new, empty store at `root`. Fails if `root` already exists
    /// and already holds a store (a `vector_index.bin` or any `*.json`
    /// chunk record) — a directory with unrelated contents is fine.
    pub async fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.is_dir() && is_store_directory(&root) {
            return Err(VectorStoreError::AlreadyExists(root));
        }
        std::fs::create_dir_all(&root)?;
        let config = StoreConfig::default();
        std::fs::write(root.join("config.json"), serde_json::to_vec_pretty(&config)?)?;
        let index = VectorIndex::create(&root)?;
        Self::assemble(root, config, index).await
    }

    /// Open an existing store at `root`. Fails with `NotFound` if `root`
    /// doesn't exist, and with `NotAStore` if it exists but holds neither a
    /// readable index nor any chunk record (§4.H).
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(VectorStoreError::NotFound(root.display().to_string()));
        }
        // Captured before `load_or_rebuild` runs: a missing/corrupt index is
        // rebuilt (and persisted) as a side effect of opening, which would
        // otherwise make an arbitrary directory look store-shaped after the
        // fact.
        let had_index_file = root.join("vector_index.bin").is_file();
        let had_chunk_records = has_chunk_records(&root);

        let config = StoreConfig::load(&root);
        let index = VectorIndex::load_or_rebuild(&root)?;
        if index.count() == 0 && !had_index_file && !had_chunk_records {
            return Err(VectorStoreError::NotAStore(root));
        }
        Self::assemble(root, config, index).await
    }

    /// Open `root` if it already holds a store, otherwise create one.
    pub async fn create_or_open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.is_dir() && is_store_directory(&root) {
            Self::open(root).await
        } else {
            Self::create(root).await
        }
    }

    /// Permanently remove a store directory and everything under it.
    /// Refuses non-store directories (and a missing path) by returning
    /// `false` rather than erroring or deleting arbitrary contents.
    pub fn delete(root: impl AsRef<Path>) -> Result<bool> {
        let root = root.as_ref();
        if !root.is_dir() || !is_store_directory(root) {
            return Ok(false);
        }
        std::fs::remove_dir_all(root)?;
        Ok(true)
    }

    async fn assemble(root: PathBuf, config: StoreConfig, index: VectorIndex) -> Result<Self> {
        let cache = Arc::new(EmbeddingCache::new(embedding_cache_dir(), config.max_memory_cache_items));
        let backend = build_backend(&config).await;
        let embedder = Arc::new(Embedder::new(backend, cache));
        Ok(Self {
            root,
            config,
            index: Arc::new(index),
            embedder,
            extractors: ExtractorRegistry::with_defaults(),
        })
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            document_count: self.index.count(),
            embedding_dimension: self.embedder.dimension(),
            model_id: self.config.model_id.clone(),
        }
    }

    /// Discard and rebuild the vector index from the chunk record files on
    /// disk. Useful after manual edits to `documents/` or to recover from
    /// suspected drift between the index and the records.
    pub fn rebuild_index(&self) -> Result<()> {
        self.index.reload_from_records(&self.root)
    }

    /// Chunk, embed, and persist `content` under `id`. Each resulting chunk
    /// is stored as `<id>#<chunk_index>`; returns the created chunk ids.
    pub async fn add_text(&self, id: &str, content: &str, metadata: Value) -> Result<Vec<String>> {
        self.ingest(id, content, DocumentKind::Text, metadata, &self.config.chunking).await
    }

    /// Read, extract, chunk, embed, and persist a single file.
    pub async fn add_document(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = std::fs::read(path).map_err(|err| VectorStoreError::unreadable_source(path, err.to_string()))?;
        let extracted = self.extractors.extract(path, &bytes)?;
        let id = path.to_string_lossy().into_owned();

        let mut metadata = serde_json::json!({
            "source_path": id,
            "document_kind": format!("{:?}", extracted.kind),
        });
        if let (Some(title), Value::Object(map)) = (&extracted.title, &mut metadata) {
            map.insert("title".to_string(), Value::from(title.clone()));
        }

        self.ingest(&id, &extracted.text, extracted.kind, metadata, &self.config.chunking).await
    }

    /// Recursively walk `dir` (honoring `.gitignore`, like the teacher's
    /// workspace scanner) and ingest every file found. Checked against
    /// `cancel` between files so a long-running ingest can be interrupted
    /// cleanly; files already persisted before cancellation remain on disk.
    pub async fn add_documents(&self, dir: &Path, cancel: CancellationToken) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let walker = ignore::WalkBuilder::new(dir).hidden(false).build();
        for entry in walker {
            if cancel.is_cancelled() {
                return Err(VectorStoreError::Cancelled);
            }
            let entry = entry.map_err(|err| VectorStoreError::unreadable_source(dir, err.to_string()))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let mut chunk_ids = self.add_document(entry.path()).await?;
            ids.append(&mut chunk_ids);
        }
        Ok(ids)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ChunkRecord>> {
        self.load_record(id).await
    }

    /// Remove `id`'s record and index entry. Returns whether anything was
    /// actually removed, so calling this twice on the same id reports
    /// `true` then `false` rather than silently succeeding both times.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let removed_from_index = self.index.remove(id);
        if removed_from_index {
            self.index.persist()?;
        }
        let path = self.record_path(id);
        let removed_file = match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };
        Ok(removed_from_index || removed_file)
    }

    pub fn all_ids(&self) -> Vec<String> {
        self.index.snapshot().into_iter().map(|(id, _)| id).collect()
    }

    /// Score every indexed embedding against `query` and return the top `k`
    /// records, richest metadata included.
    pub async fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let snapshot = self.index.snapshot();
        let refs: Vec<(&str, &[f32])> = snapshot.iter().map(|(id, e)| (id.as_str(), e.as_slice())).collect();
        let ranked = similarity::topk(query, refs, k);

        let mut results = Vec::with_capacity(ranked.len());
        for (id, score) in ranked {
            if let Some(record) = self.load_record(&id).await? {
                results.push(SearchResult::from_record(&record, score));
            }
        }
        Ok(results)
    }

    /// Embed `query` and search against it.
    pub async fn search_text(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        self.search_vector(&embedding, k).await
    }

    /// Like `search_text`, but defers loading each record's content until
    /// the stream is polled for it, instead of materializing every result
    /// up front. Takes `Arc<Store>` since the stream outlives the call.
    pub fn search_text_lazy(store: Arc<Store>, query: String, k: usize) -> impl Stream<Item = Result<SearchResult>> {
        futures::stream::unfold(LazySearchState::NotStarted { store, query, k }, |state| async move {
            match state {
                LazySearchState::NotStarted { store, query, k } => {
                    let embedding = match store.embedder.embed(&query).await {
                        Ok(embedding) => embedding,
                        Err(err) => return Some((Err(err), LazySearchState::Done)),
                    };
                    let snapshot = store.index.snapshot();
                    let refs: Vec<(&str, &[f32])> = snapshot.iter().map(|(id, e)| (id.as_str(), e.as_slice())).collect();
                    let ranked: VecDeque<(String, f32)> = similarity::topk(&embedding, refs, k).into_iter().collect();
                    next_lazy_item(store, ranked).await
                }
                LazySearchState::Loading { store, remaining } => next_lazy_item(store, remaining).await,
                LazySearchState::Done => None,
            }
        })
    }

    async fn ingest(
        &self,
        id: &str,
        text: &str,
        kind: DocumentKind,
        metadata: Value,
        options: &ChunkingOptions,
    ) -> Result<Vec<String>> {
        let boundaries = detect_boundaries(text, kind);
        let chunks = assemble_chunks(text, &boundaries, options)?;

        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let chunk_id = format!("{id}#{}", chunk.chunk_index);
            let embedding = self.embedder.embed(&chunk.content).await?;

            let mut chunk_metadata = metadata.clone();
            if let Value::Object(map) = &mut chunk_metadata {
                map.insert("chunk_index".to_string(), Value::from(chunk.chunk_index));
                map.insert("start_position".to_string(), Value::from(chunk.start_position));
                map.insert("end_position".to_string(), Value::from(chunk.end_position));
                map.insert("has_overlap".to_string(), Value::from(chunk.has_overlap));
            }

            let record = ChunkRecord::new(chunk_id.clone(), chunk.content, embedding, chunk_metadata);
            let path = self.write_record(&record)?;
            self.index.insert(record.id.clone(), record.embedding.clone(), path);
            ids.push(chunk_id);
        }

        if !ids.is_empty() {
            self.index.persist()?;
        }
        Ok(ids)
    }

    /// Canonical on-disk location for a chunk record: the store root itself,
    /// not `documents/` (that subdirectory is only scanned as a legacy
    /// rebuild source for indexes built by older layouts).
    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_id(id)))
    }

    /// Write `record` to its canonical path and return that path, so the
    /// caller can hand it straight to `VectorIndex::insert`.
    fn write_record(&self, record: &ChunkRecord) -> Result<PathBuf> {
        let path = self.record_path(&record.id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(record)?;
        {
            let mut tmp = std::fs::File::create(&tmp_path)?;
            tmp.write_all(&body)?;
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    /// Look the record up through the index first (so entries rebuilt from
    /// `documents/` or any other legacy location still resolve correctly),
    /// falling back to the canonical root path for ids the index doesn't
    /// know about.
    async fn load_record(&self, id: &str) -> Result<Option<ChunkRecord>> {
        let index = self.index.clone();
        let owned_id = id.to_string();
        let hydrated = tokio::task::spawn_blocking(move || index.hydrate(&owned_id))
            .await
            .map_err(|err| VectorStoreError::Io(std::io::Error::other(err.to_string())))??;
        if hydrated.is_some() {
            return Ok(hydrated);
        }
        read_record_file(&self.record_path(id)).await
    }
}

async fn read_record_file(path: &Path) -> Result<Option<ChunkRecord>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping malformed chunk record");
                Ok(None)
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Whether `root` is a store directory per §3: it holds either a vector
/// index file or at least one chunk record.
fn is_store_directory(root: &Path) -> bool {
    root.join("vector_index.bin").is_file() || has_chunk_records(root)
}

/// Whether `root` (or its legacy `documents/` subdirectory) contains any
/// `*.json` chunk record. `config.json` doesn't count.
fn has_chunk_records(root: &Path) -> bool {
    let mut dirs = vec![root.to_path_buf()];
    let documents_dir = root.join("documents");
    if documents_dir.is_dir() {
        dirs.push(documents_dir);
    }
    for dir in dirs {
        let Ok(read_dir) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some("config.json") {
                continue;
            }
            return true;
        }
    }
    false
}

enum LazySearchState {
    NotStarted { store: Arc<Store>, query: String, k: usize },
    Loading { store: Arc<Store>, remaining: VecDeque<(String, f32)> },
    Done,
}

async fn next_lazy_item(
    store: Arc<Store>,
    mut remaining: VecDeque<(String, f32)>,
) -> Option<(Result<SearchResult>, LazySearchState)> {
    loop {
        let (id, score) = remaining.pop_front()?;
        match store.load_record(&id).await {
            Ok(Some(record)) => {
                let item = SearchResult::from_record(&record, score);
                return Some((Ok(item), LazySearchState::Loading { store, remaining }));
            }
            Ok(None) => continue,
            Err(err) => return Some((Err(err), LazySearchState::Done)),
        }
    }
}

fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

async fn build_backend(config: &StoreConfig) -> Arc<dyn EmbeddingBackend> {
    if config.model_id == StoreConfig::default().model_id {
        return Arc::new(HashingEmbedder::new());
    }

    #[cfg(feature = "model2vec")]
    {
        let cancel = CancellationToken::new();
        match ModelManager::ensure_model(&config.model_id, config.model_download_url.as_deref(), cancel, |_, _, _| {}).await {
            Ok(path) => match Model2VecBackend::load(&path, crate::config::EMBEDDING_DIM) {
                Ok(backend) => return Arc::new(backend),
                Err(err) => tracing::warn!(error = %err, "failed to load model2vec backend, falling back to hashing embedder"),
            },
            Err(err) => tracing::warn!(error = %err, "failed to provision model artifact, falling back to hashing embedder"),
        }
    }
    #[cfg(not(feature = "model2vec"))]
    {
        tracing::warn!(model_id = %config.model_id, "real embedding backend requested but model2vec feature is disabled, using hashing embedder");
    }

    Arc::new(HashingEmbedder::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_then_add_text_then_search_finds_similar_content() {
        let dir = tempdir().unwrap();
        let store = Store::create(dir.path().join("store")).await.unwrap();

        store
            .add_text("doc-1", "Our login and security policy requires two-factor authentication.", serde_json::json!({}))
            .await
            .unwrap();
        store
            .add_text("doc-2", "The cafeteria menu changes every Monday and Thursday.", serde_json::json!({}))
            .await
            .unwrap();

        let results = store.search_text("login and security", 2).await.unwrap();
        assert!(!results.is_empty());
        assert!(results[0].content.to_lowercase().contains("login"));
    }

    #[tokio::test]
    async fn create_succeeds_on_a_directory_with_unrelated_contents() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("marker"), b"x").unwrap();
        assert!(Store::create(&root).await.is_ok());
    }

    #[tokio::test]
    async fn create_fails_on_an_existing_store_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        Store::create(&root).await.unwrap();
        assert!(matches!(Store::create(&root).await, Err(VectorStoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn open_fails_with_not_found_on_a_nonexistent_directory() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Store::open(dir.path().join("missing")).await,
            Err(VectorStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn open_fails_with_not_a_store_on_an_unrelated_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("unrelated");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("notes.txt"), b"just some notes").unwrap();
        assert!(matches!(Store::open(&root).await, Err(VectorStoreError::NotAStore(_))));
    }

    #[tokio::test]
    async fn open_succeeds_on_a_freshly_created_empty_store() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        Store::create(&root).await.unwrap();
        assert!(Store::open(&root).await.is_ok());
    }

    #[tokio::test]
    async fn persists_across_close_and_reopen() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        {
            let store = Store::create(&root).await.unwrap();
            store.add_text("doc-1", "persisted content here", serde_json::json!({})).await.unwrap();
        }
        let reopened = Store::open(&root).await.unwrap();
        assert_eq!(reopened.all_ids().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_both_the_record_and_the_index_entry() {
        let dir = tempdir().unwrap();
        let store = Store::create(dir.path().join("store")).await.unwrap();
        let ids = store.add_text("doc-1", "some content to delete later", serde_json::json!({})).await.unwrap();
        let id = ids.into_iter().next().unwrap();

        assert!(store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(!store.all_ids().contains(&id));
        assert!(!store.delete(&id).await.unwrap(), "deleting an already-deleted id reports nothing removed");
    }

    #[tokio::test]
    async fn search_text_lazy_yields_the_same_top_result_as_search_text() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::create(dir.path().join("store")).await.unwrap());
        store
            .add_text("doc-1", "Our login and security policy requires two-factor authentication.", serde_json::json!({}))
            .await
            .unwrap();

        let eager = store.search_text("login security", 1).await.unwrap();
        let lazy: Vec<_> = Store::search_text_lazy(store.clone(), "login security".to_string(), 1)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(lazy.len(), 1);
        let lazy_result = lazy.into_iter().next().unwrap().unwrap();
        assert_eq!(lazy_result.id, eager[0].id);
    }

    #[test]
    fn delete_on_a_nonexistent_store_path_reports_false() {
        let dir = tempdir().unwrap();
        assert!(!Store::delete(dir.path().join("missing")).unwrap());
    }

    #[test]
    fn delete_refuses_a_directory_that_is_not_a_store() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("unrelated");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("notes.txt"), b"just some notes").unwrap();
        assert!(!Store::delete(&root).unwrap());
        assert!(root.is_dir(), "non-store directory must be left untouched");
    }

    #[tokio::test]
    async fn delete_removes_a_real_store_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        Store::create(&root).await.unwrap();
        assert!(Store::delete(&root).unwrap());
        assert!(!root.exists());
    }
}
