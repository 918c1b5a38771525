//! Cosine similarity and top-k selection (§4.A).

use rayon::prelude::*;

use crate::error::{Result, VectorStoreError};

/// Above this many candidates, scoring fans out across `rayon`'s pool
/// instead of running on the calling thread (mirrors the teacher's
/// `refresh()`, which only parallelizes once a workspace is large enough to
/// make the fork worthwhile).
const PARALLEL_THRESHOLD: usize = 256;

/// Cosine similarity between two equal-length vectors, in `[-1.0, 1.0]`.
/// A zero-magnitude vector on either side yields `0.0` rather than `NaN`.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(VectorStoreError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Score every candidate against `query` and return the top `k` by
/// descending score, breaking ties by ascending id for a stable order.
/// Candidates with a dimension mismatch are skipped rather than failing the
/// whole search (a single corrupt entry shouldn't take the index down).
pub fn topk<'a, I>(query: &[f32], candidates: I, k: usize) -> Vec<(String, f32)>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let items: Vec<(&str, &[f32])> = candidates.into_iter().collect();

    let mut scored: Vec<(String, f32)> = if items.len() >= PARALLEL_THRESHOLD {
        items
            .par_iter()
            .filter_map(|(id, emb)| cosine(query, emb).ok().map(|score| (id.to_string(), score)))
            .collect()
    } else {
        items
            .iter()
            .filter_map(|(id, emb)| cosine(query, emb).ok().map(|score| (id.to_string(), score)))
            .collect()
    };

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(k);
    scored
}
