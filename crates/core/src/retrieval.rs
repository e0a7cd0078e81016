//! Retrieval traits: the vector index and the embedder behind it.
//!
//! The index is queried only through similarity search; how it is stored is
//! the implementation's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Separator placed between chunks when they are rendered for the model.
pub const CHUNK_DELIMITER: &str = "\n\n---\n\n";

/// A chunk returned by similarity search, most relevant first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// The chunk text
    pub text: String,

    /// Opaque identifier of the source document
    pub source_id: String,

    /// Similarity to the query (set by search)
    #[serde(default)]
    pub score: f32,
}

impl RetrievedChunk {
    pub fn new(text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            score: 0.0,
        }
    }
}

/// A chunk of a source document, ready to be embedded and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source_id: String,
}

/// The vector index.
///
/// Implementations: file-persisted JSON, in-memory (for testing).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Return up to `k` chunks ordered by decreasing similarity to `query`.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> std::result::Result<Vec<RetrievedChunk>, RetrievalError>;

    /// Distinct source identifiers present in the index, sorted.
    async fn sources(&self) -> std::result::Result<Vec<String>, RetrievalError>;

    /// Replace the entire index contents. Returns the number of chunks stored.
    async fn replace(
        &self,
        chunks: Vec<DocumentChunk>,
    ) -> std::result::Result<usize, RetrievalError>;

    /// Number of indexed chunks.
    async fn count(&self) -> std::result::Result<usize, RetrievalError>;
}

/// Turns text into embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The embedding model name.
    fn model(&self) -> &str;

    /// Embed each input, returning one vector per input in order.
    async fn embed(&self, inputs: &[String]) -> std::result::Result<Vec<Vec<f32>>, RetrievalError>;
}
