//! Best-effort PDF text extraction. Real PDF parsing (content streams,
//! fonts, compressed object streams) is out of scope for this crate — it is
//! an external collaborator's job. This extractor recovers what it can by
//! scanning for runs of printable text between PDF stream delimiters, which
//! is enough for uncompressed, simply-encoded PDFs and nothing more.

use std::path::Path;

use crate::chunk::DocumentKind;
use crate::error::Result;

use super::{require_non_empty, DocumentExtractor, ExtractedDocument};

pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn supports(&self, extension: &str) -> bool {
        extension == "pdf"
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedDocument> {
        let text = require_non_empty(path, recover_printable_runs(bytes))?;
        Ok(ExtractedDocument::plain(text, DocumentKind::Pdf))
    }
}

/// Collapse every run of 4+ printable ASCII characters into a line of its
/// own. Compressed or binary-encoded content streams will not decode to
/// anything meaningful, which is an accepted limitation of this fallback.
fn recover_printable_runs(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();
    for &byte in bytes {
        let ch = byte as char;
        if ch.is_ascii_graphic() || ch == ' ' {
            run.push(ch);
        } else {
            if run.len() >= 4 {
                out.push_str(run.trim());
                out.push('\n');
            }
            run.clear();
        }
    }
    if run.len() >= 4 {
        out.push_str(run.trim());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_printable_text_between_binary_noise() {
        let mut bytes = vec![0u8, 1, 2, 3];
        bytes.extend_from_slice(b"Hello readable world");
        bytes.extend_from_slice(&[0xff, 0xfe]);
        let doc = PdfExtractor.extract(Path::new("a.pdf"), &bytes).unwrap();
        assert!(doc.text.contains("Hello readable world"));
        assert_eq!(doc.kind, DocumentKind::Pdf);
    }

    #[test]
    fn pure_binary_input_with_no_recoverable_text_is_unreadable() {
        let bytes = vec![0u8, 1, 2, 3, 4, 5];
        let err = PdfExtractor.extract(Path::new("a.pdf"), &bytes).unwrap_err();
        assert!(matches!(err, crate::error::VectorStoreError::UnreadableSource { .. }));
    }
}
