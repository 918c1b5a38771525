//! Document extraction: turn raw file bytes into normalized text plus
//! light structural metadata, dispatched by file extension (§4.G).
//!
//! Grounded in the teacher's predicate-driven override/dispatch style from
//! `scanner.rs`'s `ScanOptions`, adapted here from path-filtering to
//! extension-keyed extractor selection.

pub mod docx;
pub mod markdown;
pub mod pdf;
pub mod text;

use std::path::Path;

use crate::chunk::DocumentKind;
use crate::error::{Result, VectorStoreError};

/// Normalized output of running an extractor over a source file.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub kind: DocumentKind,
    pub title: Option<String>,
    pub has_headers: bool,
    pub has_code_blocks: bool,
    pub has_lists: bool,
}

impl ExtractedDocument {
    fn plain(text: String, kind: DocumentKind) -> Self {
        Self {
            text,
            kind,
            title: None,
            has_headers: false,
            has_code_blocks: false,
            has_lists: false,
        }
    }
}

/// A format-specific extractor. Implementations are pure functions of the
/// file's bytes; none perform I/O themselves.
pub trait DocumentExtractor: Send + Sync {
    /// Whether this extractor handles `extension` (lowercased, no leading dot).
    fn supports(&self, extension: &str) -> bool;
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedDocument>;
}

/// Shared encoding fallback (§4.G): try UTF-8, and on invalid byte sequences
/// fall back to a lossless Latin-1 byte-to-codepoint decode.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// The shared failure mode at the end of every extractor: if nothing
/// resembling text survived decoding, the source is unreadable rather than
/// silently empty.
pub(crate) fn require_non_empty(path: &Path, text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(VectorStoreError::unreadable_source(path, "no non-empty text could be decoded from source bytes"))
    } else {
        Ok(text)
    }
}

/// Extension-keyed extractor dispatch table.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn DocumentExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self { extractors: Vec::new() }
    }

    /// The registry used by `Store` by default: Markdown and Text are fully
    /// implemented; Pdf and Docx fall back to best-effort lossy decoding,
    /// since real binary parsing for those formats is outside this crate's
    /// scope and belongs to an external collaborator.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(markdown::MarkdownExtractor));
        registry.register(Box::new(pdf::PdfExtractor));
        registry.register(Box::new(docx::DocxExtractor));
        registry.register(Box::new(text::TextExtractor));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn DocumentExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn resolve(&self, extension: &str) -> Option<&dyn DocumentExtractor> {
        let lowered = extension.to_lowercase();
        self.extractors.iter().find(|e| e.supports(&lowered)).map(|e| e.as_ref())
    }

    pub fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedDocument> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let extractor = self
            .resolve(extension)
            .ok_or_else(|| VectorStoreError::UnsupportedFormat(extension.to_string()))?;
        extractor.extract(path, bytes)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
