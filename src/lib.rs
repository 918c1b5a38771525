//! Local, file-based semantic search: chunk documents, embed the chunks,
//! and answer cosine-similarity top-k queries without an external database.
//!
//! The primary entry point is [`Store`]; everything else is exposed for
//! callers who want to compose the pieces directly (custom chunking,
//! alternate embedding backends, or raw vector math).

pub mod cache;
pub mod chunk;
pub mod config;
pub mod embedder;
pub mod error;
pub mod extract;
pub mod index;
pub mod record;
pub mod similarity;
pub mod store;

pub use chunk::{Chunk, ChunkStrategy, ChunkingOptions};
pub use config::StoreConfig;
pub use error::{Result, VectorStoreError};
pub use record::{ChunkRecord, SearchResult};
pub use store::{Store, StoreStats};
