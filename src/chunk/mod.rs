//! Chunking engine: boundary detection (§4.E) + size-bounded assembly (§4.F).

pub mod assembler;
pub mod boundary;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorStoreError};

pub use assembler::assemble_chunks;
pub use boundary::{detect_boundaries, Boundary, BoundaryKind, DocumentKind};

/// How aggressively the assembler restricts which boundary kinds it will
/// stop at (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStrategy {
    /// Paragraph/Sentence/Word boundaries only.
    Semantic,
    /// Header/Section/Page/CodeBlock/ListItem boundaries only.
    Structural,
    /// All boundary kinds are eligible stop points.
    Hybrid,
}

/// Size bounds, overlap, and behavior flags for the chunk assembler (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingOptions {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub overlap_size: usize,
    pub strategy: ChunkStrategy,
    pub preserve_headers: bool,
    pub include_page_numbers: bool,
    pub respect_document_structure: bool,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            min_chunk_size: 100,
            overlap_size: 50,
            strategy: ChunkStrategy::Hybrid,
            preserve_headers: true,
            include_page_numbers: false,
            respect_document_structure: true,
        }
    }
}

impl ChunkingOptions {
    /// Enforce `0 ≤ min ≤ max` and `0 ≤ overlap < min` (the latter only binds
    /// when overlap is nonzero, so `min == 0` with `overlap == 0` is valid).
    pub fn validate(&self) -> Result<()> {
        if self.min_chunk_size > self.max_chunk_size {
            return Err(VectorStoreError::invalid_input(format!(
                "min_chunk_size ({}) must be <= max_chunk_size ({})",
                self.min_chunk_size, self.max_chunk_size
            )));
        }
        if self.overlap_size > 0 && self.overlap_size >= self.min_chunk_size {
            return Err(VectorStoreError::invalid_input(format!(
                "overlap_size ({}) must be < min_chunk_size ({})",
                self.overlap_size, self.min_chunk_size
            )));
        }
        Ok(())
    }
}

/// A single assembled chunk, prior to embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_index: usize,
    pub content: String,
    pub start_position: usize,
    pub end_position: usize,
    pub word_count: usize,
    pub character_count: usize,
    pub has_overlap: bool,
    /// Nearest preceding header, when the source document carries one
    /// (Markdown extractor's `header_context`, §4.G).
    pub header_context: Option<String>,
}
