//! Local feature-hashing embedder.
//!
//! Maps word unigrams and bigrams into a fixed-width vector with a signed
//! hash, then L2-normalizes. No network and no model download, so it is the
//! default for development and for tests. Vectors are stable across runs,
//! which matters because they are persisted in the index file.

use async_trait::async_trait;
use raglab_core::error::RetrievalError;
use raglab_core::retrieval::Embedder;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub struct HashingEmbedder {
    model: String,
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            model: format!("feature-hashing-{dimensions}"),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, bigram.as_bytes(), 0.5);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(inputs.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn vectors_are_normalized() {
        let embedder = HashingEmbedder::new(384);
        let v = embedder.embed_one("Key derivation functions in Rust");
        assert_eq!(v.len(), 384);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        assert!(embedder.embed_one("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn deterministic_and_case_insensitive() {
        let embedder = HashingEmbedder::new(64);
        assert_eq!(embedder.embed_one("Portfolio Site"), embedder.embed_one("portfolio site"));
    }

    #[test]
    fn overlapping_text_scores_higher() {
        let embedder = HashingEmbedder::new(384);
        let query = embedder.embed_one("compiler project written in rust");
        let related = embedder.embed_one("A toy compiler project written in Rust with an LLVM backend");
        let unrelated = embedder.embed_one("Watercolor painting classes on weekends");
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn embed_preserves_input_order() {
        let embedder = HashingEmbedder::new(32);
        let inputs = vec!["alpha".to_string(), "beta".to_string()];
        let out = embedder.embed(&inputs).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], embedder.embed_one("alpha"));
        assert_eq!(out[1], embedder.embed_one("beta"));
        assert_eq!(embedder.model(), "feature-hashing-32");
    }
}
