//! Best-effort DOCX text extraction. A real implementation would unzip the
//! OOXML package and parse `word/document.xml`; that is out of scope here
//! (an external collaborator's job, per the same boundary as the PDF
//! extractor). This fallback does a lossy decode of the raw bytes, which
//! surfaces readable content for uncompressed fixtures and otherwise
//! degrades to near-empty text rather than failing the ingest.

use std::path::Path;

use crate::chunk::DocumentKind;
use crate::error::Result;

use super::{require_non_empty, DocumentExtractor, ExtractedDocument};

pub struct DocxExtractor;

impl DocumentExtractor for DocxExtractor {
    fn supports(&self, extension: &str) -> bool {
        extension == "docx" || extension == "doc"
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedDocument> {
        let text = String::from_utf8_lossy(bytes)
            .chars()
            .filter(|c| c.is_ascii_graphic() || c.is_whitespace())
            .collect::<String>();
        let text = require_non_empty(path, text)?;
        Ok(ExtractedDocument::plain(text, DocumentKind::Docx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_non_ascii_noise_from_a_fixture() {
        let doc = DocxExtractor.extract(Path::new("a.docx"), b"Plain readable body text").unwrap();
        assert_eq!(doc.text, "Plain readable body text");
        assert_eq!(doc.kind, DocumentKind::Docx);
    }

    #[test]
    fn pure_binary_input_with_no_recoverable_text_is_unreadable() {
        let bytes = vec![0xff, 0xfe, 0x00, 0x01, 0x02];
        let err = DocxExtractor.extract(Path::new("a.docx"), &bytes).unwrap_err();
        assert!(matches!(err, crate::error::VectorStoreError::UnreadableSource { .. }));
    }
}
