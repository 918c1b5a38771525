//! Size-bounded chunk assembly (§4.F).
//!
//! Walks `text` once over a `char`-indexed cursor, greedily folding boundary
//! segments into a size budget until it would exceed `max_chunk_size`, then
//! picking the best nearby stop point and emitting a chunk. Mirrors the
//! teacher's `ast_guided_chunks`/`line_range_chunks` greedy-packing shape,
//! generalized from a line budget to a character budget against arbitrary
//! boundaries.
//!
//! Overlap is carried forward only as a size-budget reservation, never as
//! duplicated text: the next chunk's budget starts pre-charged with the
//! overlap length, but its stored `content` is always the literal,
//! non-duplicated slice of the source text between two cursor positions.

use super::boundary::{Boundary, BoundaryKind};
use super::{Chunk, ChunkStrategy, ChunkingOptions};
use crate::error::Result;

/// Assemble `text` into chunks honoring `options`, using `boundaries` as
/// candidate stop points. `boundaries` need not be pre-filtered by strategy;
/// this function does that itself.
pub fn assemble_chunks(text: &str, boundaries: &[Boundary], options: &ChunkingOptions) -> Result<Vec<Chunk>> {
    options.validate()?;
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();

    let mut relevant: Vec<&Boundary> = boundaries
        .iter()
        .filter(|b| eligible_for_strategy(b.kind, options.strategy))
        .filter(|b| b.position <= total_chars)
        .collect();
    relevant.sort_by_key(|b| b.position);

    let mut chunks = Vec::new();
    let mut pos = 0usize;
    let mut idx = 0usize;
    let mut chunk_start = 0usize;
    let mut budget = 0usize;
    let mut overlap_chars = 0usize;

    for b in &relevant {
        if b.position < pos {
            continue;
        }
        let seg_len = b.position - pos;

        if budget + seg_len <= options.max_chunk_size {
            budget += seg_len;
            pos = b.position;
            continue;
        }

        let seg: Vec<char> = chars[pos..b.position].to_vec();
        let stop = select_stop_point(&seg, pos, budget, &relevant, options);
        let resulting_len = budget + stop;
        let end_position = pos + stop;

        if resulting_len >= options.min_chunk_size {
            let content: String = chars[chunk_start..end_position].iter().collect();
            let character_count = content.chars().count();
            chunks.push(Chunk {
                chunk_index: idx,
                word_count: content.split_whitespace().count(),
                content: content.clone(),
                start_position: chunk_start,
                end_position,
                character_count,
                has_overlap: overlap_chars > 0,
                header_context: None,
            });
            idx += 1;

            let overlap_text = extract_overlap(&content, options.overlap_size);
            overlap_chars = overlap_text.chars().count();
            chunk_start = end_position;
            budget = overlap_chars;
        } else {
            // Below the floor standalone; keep accumulating rather than
            // emitting a too-small chunk. `chunk_start` is unchanged so the
            // eventual chunk still spans everything read since its start.
            budget = resulting_len;
        }
        pos = end_position;
    }

    if pos < total_chars {
        let content: String = chars[chunk_start..total_chars].iter().collect();
        let character_count = content.chars().count();
        if character_count >= options.min_chunk_size {
            chunks.push(Chunk {
                chunk_index: idx,
                word_count: content.split_whitespace().count(),
                content,
                start_position: chunk_start,
                end_position: total_chars,
                character_count,
                has_overlap: overlap_chars > 0,
                header_context: None,
            });
        }
    }

    if chunks.is_empty() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                chunk_index: 0,
                content: trimmed.to_string(),
                start_position: 0,
                end_position: total_chars,
                word_count: trimmed.split_whitespace().count(),
                character_count: trimmed.chars().count(),
                has_overlap: false,
                header_context: None,
            });
        }
    }

    Ok(chunks)
}

fn eligible_for_strategy(kind: BoundaryKind, strategy: ChunkStrategy) -> bool {
    match strategy {
        ChunkStrategy::Semantic => matches!(
            kind,
            BoundaryKind::Paragraph | BoundaryKind::Sentence | BoundaryKind::Word
        ),
        ChunkStrategy::Structural => matches!(
            kind,
            BoundaryKind::Header
                | BoundaryKind::Section
                | BoundaryKind::Page
                | BoundaryKind::CodeBlock
                | BoundaryKind::ListItem
        ),
        ChunkStrategy::Hybrid => true,
    }
}

/// Rank boundaries within `seg` by descending priority, then ascending
/// distance from the ideal cut point; take the first whose resulting chunk
/// length falls in `[min_chunk_size, max_chunk_size]`. Falls back to the
/// last sentence terminator, then the last whitespace run, then a hard cut.
fn select_stop_point(
    seg: &[char],
    seg_start_pos: usize,
    buf_len: usize,
    boundaries: &[&Boundary],
    options: &ChunkingOptions,
) -> usize {
    let seg_len = seg.len();
    let target_offset = options.max_chunk_size.saturating_sub(buf_len).min(seg_len);
    let target_abs = seg_start_pos + target_offset;

    let mut candidates: Vec<&&Boundary> = boundaries
        .iter()
        .filter(|b| b.position >= seg_start_pos && b.position < seg_start_pos + seg_len)
        .collect();
    candidates.sort_by(|a, b| {
        b.priority.cmp(&a.priority).then_with(|| {
            let da = (a.position as i64 - target_abs as i64).abs();
            let db = (b.position as i64 - target_abs as i64).abs();
            da.cmp(&db)
        })
    });

    for c in candidates {
        let offset = c.position - seg_start_pos;
        let resulting_len = buf_len + offset;
        if resulting_len >= options.min_chunk_size && resulting_len <= options.max_chunk_size {
            return offset;
        }
    }

    let search_window = &seg[..target_offset.min(seg_len)];
    if let Some(offset) = search_window.iter().rposition(|&c| c == '.' || c == '!' || c == '?') {
        return (offset + 1).min(seg_len);
    }
    if let Some(offset) = search_window.iter().rposition(|c| c.is_whitespace()) {
        return (offset + 1).min(seg_len);
    }

    target_offset.max(1).min(seg_len.max(1)).min(seg_len)
}

/// Pull a trailing window (up to `2 * overlap_size` chars) from `content`
/// and trim it back to the nearest sentence end, then the nearest word
/// boundary, preferring a clean cut over the raw character count.
fn extract_overlap(content: &str, overlap_size: usize) -> String {
    if overlap_size == 0 {
        return String::new();
    }
    let chars: Vec<char> = content.chars().collect();
    let total = chars.len();
    let window_len = (2 * overlap_size).min(total);
    let window = &chars[total - window_len..];

    if let Some(idx) = window.iter().rposition(|&c| c == '.' || c == '!' || c == '?') {
        let suffix_len = window.len() - (idx + 1);
        if suffix_len >= overlap_size / 2 {
            let suffix: String = window[idx + 1..].iter().collect();
            return suffix.trim_start().to_string();
        }
    }

    if let Some(idx) = window.iter().rposition(|c| c.is_whitespace()) {
        let suffix_len = window.len() - (idx + 1);
        if suffix_len >= overlap_size / 3 {
            return window[idx + 1..].iter().collect();
        }
    }

    let take = overlap_size.min(window.len());
    window[window.len() - take..].iter().collect()
}
