//! Markdown extractor: decodes text and detects a handful of structural
//! signals (title, headers, fenced code, lists) that the chunk assembler's
//! boundary detector also looks for.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::chunk::DocumentKind;
use crate::error::Result;

use super::{decode_text, require_non_empty, DocumentExtractor, ExtractedDocument};

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,2}[ \t]+(.+)$").expect("static markdown title regex compiles"))
}

pub struct MarkdownExtractor;

impl DocumentExtractor for MarkdownExtractor {
    fn supports(&self, extension: &str) -> bool {
        matches!(extension, "md" | "markdown" | "mdown" | "mkd")
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedDocument> {
        let text = require_non_empty(path, decode_text(bytes))?;
        let title = title_regex()
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string()));

        let has_headers = text.lines().any(|line| line.trim_start().starts_with('#'));
        let has_code_blocks = text.contains("```");
        let has_lists = text
            .lines()
            .any(|line| {
                let trimmed = line.trim_start();
                trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ")
            });

        Ok(ExtractedDocument {
            text,
            kind: DocumentKind::Markdown,
            title,
            has_headers,
            has_code_blocks,
            has_lists,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_from_first_h1() {
        let doc = MarkdownExtractor
            .extract(Path::new("a.md"), b"# My Document\n\nSome body text.")
            .unwrap();
        assert_eq!(doc.title.as_deref(), Some("My Document"));
        assert!(doc.has_headers);
    }

    #[test]
    fn extracts_title_from_first_h2_when_there_is_no_h1() {
        let doc = MarkdownExtractor.extract(Path::new("a.md"), b"## Subheading only\n").unwrap();
        assert_eq!(doc.title.as_deref(), Some("Subheading only"));
    }

    #[test]
    fn falls_back_to_the_filename_when_there_is_no_heading() {
        let doc = MarkdownExtractor.extract(Path::new("release-notes.md"), b"Just a paragraph, no headings.").unwrap();
        assert_eq!(doc.title.as_deref(), Some("release-notes"));
    }

    #[test]
    fn detects_code_blocks_and_lists() {
        let doc = MarkdownExtractor
            .extract(Path::new("a.md"), b"- item one\n- item two\n\n```rust\nfn main() {}\n```\n")
            .unwrap();
        assert!(doc.has_lists);
        assert!(doc.has_code_blocks);
    }

    #[test]
    fn supports_the_documented_markdown_extensions() {
        let extractor = MarkdownExtractor;
        for ext in ["md", "markdown", "mdown", "mkd"] {
            assert!(extractor.supports(ext), "{ext} should be supported");
        }
        assert!(!extractor.supports("txt"));
    }
}
