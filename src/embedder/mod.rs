//! Embedding backends and the cache-fronted façade used by `Store` (§4.D).

pub mod model_manager;
#[cfg(feature = "model2vec")]
pub mod model2vec_backend;

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::cache::EmbeddingCache;
use crate::config::EMBEDDING_DIM;
use crate::error::{Result, VectorStoreError};

pub use model_manager::ModelManager;
#[cfg(feature = "model2vec")]
pub use model2vec_backend::Model2VecBackend;

/// A concrete embedding implementation. Implementations must be safe to
/// call from a blocking thread pool and must always return vectors of
/// [`EmbeddingBackend::dimension`] length.
pub trait EmbeddingBackend: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Deterministic, dependency-free stand-in backend used when no real model
/// has been provisioned. Hashes overlapping word shingles into fixed
/// buckets (a standard feature-hashing trick), then L2-normalizes the
/// result, so semantically similar short texts land closer together than
/// chance would predict while remaining fully reproducible and offline.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self { dimension: EMBEDDING_DIM }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingBackend for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dimension];
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(vector);
        }
        for window in 1..=2 {
            for shingle in tokens.windows(window.min(tokens.len())) {
                let joined = shingle.join(" ");
                let mut hasher = Sha256::new();
                hasher.update(joined.as_bytes());
                let digest = hasher.finalize();
                let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize % self.dimension;
                let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
                vector[bucket] += sign;
            }
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cache-fronted embedding façade: every call checks the content-hash cache
/// before touching the backend, and every cache miss is written back after
/// a successful embed.
pub struct Embedder {
    backend: Arc<dyn EmbeddingBackend>,
    cache: Arc<EmbeddingCache>,
}

impl Embedder {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, cache: Arc<EmbeddingCache>) -> Self {
        Self { backend, cache }
    }

    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    /// Embed `text`, serving from cache when possible. Model inference runs
    /// on a blocking thread since backends (hash-based or neural) are
    /// synchronous CPU work.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(VectorStoreError::invalid_input("text must not be empty or whitespace"));
        }
        if let Some(cached) = self.cache.get(text) {
            return Ok(cached);
        }
        let backend = self.backend.clone();
        let owned = text.to_string();
        let embedding = tokio::task::spawn_blocking(move || backend.embed(&owned))
            .await
            .map_err(|err| VectorStoreError::embedding_failed(err))??;

        if embedding.len() != self.dimension() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension(),
                actual: embedding.len(),
            });
        }
        self.cache.set(text, embedding.clone())?;
        Ok(embedding)
    }

    /// Embed a batch of texts, preserving input order. Each entry still goes
    /// through the single-item cache/backend path; callers with very large
    /// batches should chunk their own concurrency via the `Store` layer.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
