//! In-memory vector index, useful for testing and ephemeral runs.

use async_trait::async_trait;
use raglab_core::error::RetrievalError;
use raglab_core::retrieval::{DocumentChunk, Embedder, RetrievedChunk, VectorIndex};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vector::{IndexedChunk, vector_search};

/// An index that keeps embedded chunks in a Vec. Nothing is persisted.
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    chunks: Arc<RwLock<Vec<IndexedChunk>>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            chunks: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

/// Embed document chunks in order, pairing each with its vector.
pub(crate) async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: Vec<DocumentChunk>,
) -> Result<Vec<IndexedChunk>, RetrievalError> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed(&texts).await?;
    if embeddings.len() != chunks.len() {
        return Err(RetrievalError::EmbeddingFailed(format!(
            "embedder returned {} vectors for {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }

    Ok(chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| IndexedChunk {
            text: chunk.text,
            source_id: chunk.source_id,
            embedding,
        })
        .collect())
}

/// Embed a single query string.
pub(crate) async fn embed_query(
    embedder: &dyn Embedder,
    query: &str,
) -> Result<Vec<f32>, RetrievalError> {
    embedder
        .embed(&[query.to_string()])
        .await?
        .pop()
        .ok_or_else(|| RetrievalError::EmbeddingFailed("embedder returned no vector".into()))
}

pub(crate) fn distinct_sources(chunks: &[IndexedChunk]) -> Vec<String> {
    chunks
        .iter()
        .map(|c| c.source_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let chunks = self.chunks.read().await;
        if chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = embed_query(self.embedder.as_ref(), query).await?;
        Ok(vector_search(&chunks, &query_embedding, k))
    }

    async fn sources(&self) -> Result<Vec<String>, RetrievalError> {
        Ok(distinct_sources(&self.chunks.read().await))
    }

    async fn replace(&self, chunks: Vec<DocumentChunk>) -> Result<usize, RetrievalError> {
        let indexed = embed_chunks(self.embedder.as_ref(), chunks).await?;
        let count = indexed.len();
        *self.chunks.write().await = indexed;
        Ok(count)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.chunks.read().await.len())
    }
}
