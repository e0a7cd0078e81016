//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and top-k ranking over embedded chunks.

use raglab_core::retrieval::RetrievedChunk;
use serde::{Deserialize, Serialize};

/// A chunk stored in an index together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub text: String,
    pub source_id: String,
    pub embedding: Vec<f32>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank chunks by cosine similarity to a query embedding.
///
/// Returns at most `limit` chunks sorted by descending similarity, with
/// `score` set. Ties keep index order, so results are deterministic.
pub fn vector_search(
    chunks: &[IndexedChunk],
    query_embedding: &[f32],
    limit: usize,
) -> Vec<RetrievedChunk> {
    let mut scored: Vec<(f32, &IndexedChunk)> = chunks
        .iter()
        .map(|chunk| (cosine_similarity(&chunk.embedding, query_embedding), chunk))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
        .into_iter()
        .map(|(score, chunk)| RetrievedChunk {
            text: chunk.text.clone(),
            source_id: chunk.source_id.clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            text: text.into(),
            source_id: format!("data/{text}.md"),
            embedding,
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // 1 / sqrt(2)
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn vector_search_ranks_by_similarity() {
        let query = vec![1.0, 0.0, 0.0];
        let chunks = vec![
            chunk("a", vec![0.0, 1.0, 0.0]),
            chunk("b", vec![1.0, 0.0, 0.0]),
            chunk("c", vec![0.5, 0.5, 0.0]),
        ];

        let results = vector_search(&chunks, &query, 10);
        let texts: Vec<_> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["b", "c", "a"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[0].source_id, "data/b.md");
    }

    #[test]
    fn vector_search_respects_limit() {
        let query = vec![1.0, 0.0];
        let chunks: Vec<_> = (0..10)
            .map(|i| chunk(&format!("e{i}"), vec![1.0, i as f32 * 0.1]))
            .collect();

        let results = vector_search(&chunks, &query, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "e0");
    }

    #[test]
    fn vector_search_empty_index() {
        assert!(vector_search(&[], &[1.0], 15).is_empty());
    }
}
