//! Store-wide configuration, mirroring the teacher's `#[serde(default)]` /
//! best-effort-load pattern for `.cortexast.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkingOptions;

/// Dimensionality every embedding in this crate must have.
pub const EMBEDDING_DIM: usize = 768;

/// Capacity of the in-memory embedding cache tier by default.
const DEFAULT_MEMORY_CACHE_ITEMS: usize = 10_000;

/// Persisted, user-overridable store configuration. Read from an optional
/// `config.json` at the store root; absent or malformed files fall back to
/// `Default` silently (the file is advisory, not required by the core).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Identifier of the embedding model to provision and use.
    pub model_id: String,
    /// Default chunking options applied by `add_document`/`add_documents`.
    pub chunking: ChunkingOptions,
    /// Max number of embeddings held in the in-memory cache tier.
    pub max_memory_cache_items: usize,
    /// Download URL template for the configured model artifact.
    pub model_download_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            model_id: "vectorstore/hashing-v1".to_string(),
            chunking: ChunkingOptions::default(),
            max_memory_cache_items: DEFAULT_MEMORY_CACHE_ITEMS,
            model_download_url: None,
        }
    }
}

impl StoreConfig {
    /// Best-effort load of `<store>/config.json`; never fails, falls back to
    /// `Default` on any I/O or parse error (the file is optional per §6).
    pub fn load(store_root: &Path) -> Self {
        let path = store_root.join("config.json");
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        serde_json::from_str(&text).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "config.json malformed, using defaults");
            Self::default()
        })
    }
}

/// Resolve `~/.vectorstore`, the per-user cache root for models and the
/// shared embedding cache (§6).
pub fn user_cache_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vectorstore")
}

pub fn model_cache_dir(model_id: &str) -> PathBuf {
    user_cache_root().join("models").join(sanitize(model_id))
}

pub fn embedding_cache_dir() -> PathBuf {
    user_cache_root().join("cache").join("embeddings")
}

/// Model ids may contain path separators (e.g. `org/model-name`); flatten
/// them into a single safe directory component.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
