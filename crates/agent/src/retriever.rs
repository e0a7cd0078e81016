//! Context retrieval: one broad similarity search per query, rendered into
//! the initial user turn.

use raglab_core::error::RetrievalError;
use raglab_core::retrieval::{CHUNK_DELIMITER, RetrievedChunk, VectorIndex};
use std::sync::Arc;
use tracing::debug;

/// Default number of chunks fetched up front.
pub const DEFAULT_RETRIEVAL_K: usize = 15;

pub struct ContextRetriever {
    index: Arc<dyn VectorIndex>,
    k: usize,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn VectorIndex>, k: usize) -> Self {
        Self { index, k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Up to `k` chunks most similar to `query`, most relevant first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let chunks = self.index.similarity_search(query, self.k).await?;
        debug!(index = self.index.name(), k = self.k, found = chunks.len(), "Context retrieved");
        Ok(chunks)
    }
}

/// Render chunks as `[i] (source: S)` blocks in retrieval order, 1-based.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] (source: {})\n{}", i + 1, chunk.source_id, chunk.text))
        .collect::<Vec<_>>()
        .join(CHUNK_DELIMITER)
}

/// The opening user turn: retrieved context followed by the question.
pub fn initial_user_turn(context: &str, query: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {query}")
}
