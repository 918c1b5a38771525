//! Format-aware boundary detection (§4.E).
//!
//! Boundaries are candidate split points ranked by how natural a stopping
//! point they are. Positions are character offsets, never byte offsets, so
//! downstream slicing over a `char`-indexed cursor never lands mid-codepoint.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The kind of document a boundary list was detected for. Drives which
/// regexes run and what priorities apply (§4.E's table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Markdown,
    Pdf,
    Docx,
    Text,
}

/// A candidate split point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    /// Character offset within the normalized text.
    pub position: usize,
    pub kind: BoundaryKind,
    /// Higher priority means a more natural stopping point.
    pub priority: i32,
    /// Free-form context, e.g. the header text for a `Header` boundary.
    pub context: Option<String>,
}

impl Boundary {
    fn new(position: usize, kind: BoundaryKind, priority: i32) -> Self {
        Self {
            position,
            kind,
            priority,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryKind {
    Header,
    Section,
    Paragraph,
    Line,
    Sentence,
    Word,
    Page,
    CodeBlock,
    ListItem,
    Character,
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("static boundary regex compiles"))
        }
    };
}

static_regex!(re_atx_header, r"(?m)^(#{1,6})[ \t]+(.*)$");
static_regex!(re_fenced_code, r"(?m)^```");
static_regex!(re_unordered_list, r"(?m)^[ \t]*[-*+][ \t]+");
static_regex!(re_ordered_list, r"(?m)^[ \t]*\d+\.[ \t]+");
static_regex!(re_paragraph_break, r"\n[ \t]*\n");
static_regex!(re_single_newline, r"\n");
static_regex!(re_all_caps_line, r"(?m)^[A-Z][A-Z0-9 \t:&/'-]{5,98}$");
static_regex!(re_sentence_end, r"[.!?][ \t\n]+");

/// Detect boundaries for `text` according to `kind`'s priority table.
/// Returns a list sorted ascending by position; duplicate positions with
/// differing kinds are preserved (§3 invariant).
pub fn detect_boundaries(text: &str, kind: DocumentKind) -> Vec<Boundary> {
    let mut boundaries = match kind {
        DocumentKind::Markdown => detect_markdown(text),
        DocumentKind::Pdf => detect_pdf(text),
        DocumentKind::Docx => detect_docx(text),
        DocumentKind::Text => detect_text(text),
    };
    boundaries.sort_by_key(|b| b.position);
    boundaries
}

fn byte_to_char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

fn detect_markdown(text: &str) -> Vec<Boundary> {
    let mut out = Vec::new();

    for m in re_atx_header().captures_iter(text) {
        let whole = m.get(0).unwrap();
        let level = m.get(1).unwrap().as_str().len() as i32;
        let title = m.get(2).map(|g| g.as_str().trim()).unwrap_or_default();
        let pos = byte_to_char_offset(text, whole.start());
        out.push(Boundary::new(pos, BoundaryKind::Header, 10 - level).with_context(title));
    }

    for m in re_fenced_code().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.start()),
            BoundaryKind::CodeBlock,
            8,
        ));
    }

    for m in re_unordered_list().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.start()),
            BoundaryKind::ListItem,
            6,
        ));
    }
    for m in re_ordered_list().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.start()),
            BoundaryKind::ListItem,
            6,
        ));
    }

    for m in re_paragraph_break().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Paragraph,
            5,
        ));
    }

    for m in re_single_newline().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Line,
            3,
        ));
    }

    out
}

fn detect_pdf(text: &str) -> Vec<Boundary> {
    let mut out = Vec::new();

    for (byte_pos, ch) in text.char_indices() {
        if ch == '\u{000c}' {
            out.push(Boundary::new(
                byte_to_char_offset(text, byte_pos),
                BoundaryKind::Page,
                9,
            ));
        }
    }

    for m in re_all_caps_line().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.start()),
            BoundaryKind::Section,
            7,
        ));
    }

    for m in re_paragraph_break().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Paragraph,
            5,
        ));
    }

    for m in re_sentence_end().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Sentence,
            4,
        ));
    }

    out
}

fn detect_docx(text: &str) -> Vec<Boundary> {
    let mut out = Vec::new();

    for (byte_pos, ch) in text.char_indices() {
        if ch == '\u{000c}' {
            out.push(Boundary::new(
                byte_to_char_offset(text, byte_pos),
                BoundaryKind::Section,
                8,
            ));
        }
    }

    for m in re_all_caps_line().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.start()),
            BoundaryKind::Header,
            7,
        ));
    }

    for m in re_paragraph_break().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Paragraph,
            5,
        ));
    }

    for m in re_sentence_end().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Sentence,
            4,
        ));
    }

    out
}

fn detect_text(text: &str) -> Vec<Boundary> {
    let mut out = Vec::new();

    for m in re_paragraph_break().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Paragraph,
            5,
        ));
    }

    for m in re_sentence_end().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Sentence,
            4,
        ));
    }

    for m in Regex::new(r"\s+").unwrap().find_iter(text) {
        out.push(Boundary::new(
            byte_to_char_offset(text, m.end()),
            BoundaryKind::Word,
            2,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_header_priority_decreases_with_level() {
        let text = "# Title\n\nsome text\n\n## Sub\n\nmore";
        let boundaries = detect_boundaries(text, DocumentKind::Markdown);
        let h1 = boundaries
            .iter()
            .find(|b| b.kind == BoundaryKind::Header && b.context.as_deref() == Some("Title"))
            .unwrap();
        let h2 = boundaries
            .iter()
            .find(|b| b.kind == BoundaryKind::Header && b.context.as_deref() == Some("Sub"))
            .unwrap();
        assert_eq!(h1.priority, 9);
        assert_eq!(h2.priority, 8);
    }

    #[test]
    fn boundaries_are_sorted_ascending_and_in_range() {
        let text = "Para one.\n\nPara two. Sentence two! Sentence three?\n\nPara three.";
        let boundaries = detect_boundaries(text, DocumentKind::Text);
        let mut prev = 0usize;
        for b in &boundaries {
            assert!(b.position >= prev || b.position == prev);
            assert!(b.position <= text.chars().count());
            prev = b.position.max(prev);
        }
        let mut sorted = boundaries.clone();
        sorted.sort_by_key(|b| b.position);
        assert_eq!(boundaries, sorted);
    }

    #[test]
    fn pdf_page_breaks_detected() {
        let text = "Page one content\u{000c}Page two content";
        let boundaries = detect_boundaries(text, DocumentKind::Pdf);
        assert!(boundaries.iter().any(|b| b.kind == BoundaryKind::Page));
    }

    #[test]
    fn empty_text_has_no_boundaries() {
        assert!(detect_boundaries("", DocumentKind::Text).is_empty());
    }
}
