//! Plain text extractor for the extensions §4.G treats as already-normalized
//! text (`.txt .text .log .csv .json .xml`).

use std::path::Path;

use crate::chunk::DocumentKind;
use crate::error::Result;

use super::{decode_text, require_non_empty, DocumentExtractor, ExtractedDocument};

pub struct TextExtractor;

impl DocumentExtractor for TextExtractor {
    fn supports(&self, extension: &str) -> bool {
        matches!(extension, "txt" | "text" | "log" | "csv" | "json" | "xml")
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedDocument> {
        let text = require_non_empty(path, decode_text(bytes))?;
        Ok(ExtractedDocument::plain(text, DocumentKind::Text))
    }
}
