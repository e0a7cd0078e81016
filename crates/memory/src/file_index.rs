//! File-persisted vector index.
//!
//! The whole index is one JSON document at `<index_dir>/index.json`: the
//! embedding model it was built with, a build timestamp, and every chunk with
//! its vector. It is loaded into memory on open and rewritten on every
//! `replace`, via a temp file and rename so readers never see a torn write.
//!
//! A missing file is an empty index. A file that cannot be read or parsed, or
//! that was built with a different embedding model, makes queries fail with
//! `IndexUnavailable` until the next successful ingest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use raglab_core::error::RetrievalError;
use raglab_core::retrieval::{DocumentChunk, Embedder, RetrievedChunk, VectorIndex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::in_memory::{distinct_sources, embed_chunks, embed_query};
use crate::vector::{IndexedChunk, vector_search};

const INDEX_FILE: &str = "index.json";
const FORMAT_VERSION: u32 = 1;

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    embedding_model: String,
    built_at: DateTime<Utc>,
    chunks: Vec<IndexedChunk>,
}

/// What was found on disk at open time.
enum IndexState {
    Ready(Vec<IndexedChunk>),
    Unavailable(String),
}

pub struct FileIndex {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    state: RwLock<IndexState>,
}

impl FileIndex {
    /// Open the index stored under `dir`.
    pub async fn open(dir: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Self {
        let path = dir.as_ref().join(INDEX_FILE);
        let state = Self::load(&path, embedder.model()).await;
        match &state {
            IndexState::Ready(chunks) => {
                debug!(path = %path.display(), count = chunks.len(), "Vector index loaded");
            }
            IndexState::Unavailable(reason) => {
                warn!(path = %path.display(), %reason, "Vector index unavailable");
            }
        }
        Self {
            path,
            embedder,
            state: RwLock::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path, expected_model: &str) -> IndexState {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return IndexState::Ready(Vec::new());
            }
            Err(e) => return IndexState::Unavailable(format!("failed to read index: {e}")),
        };

        let file: IndexFile = match serde_json::from_str(&content) {
            Ok(f) => f,
            Err(e) => return IndexState::Unavailable(format!("corrupt index file: {e}")),
        };

        if file.version != FORMAT_VERSION {
            return IndexState::Unavailable(format!(
                "index format version {} is not supported",
                file.version
            ));
        }
        if file.embedding_model != expected_model {
            return IndexState::Unavailable(format!(
                "index was built with embedding model '{}' but '{}' is configured; re-run ingest",
                file.embedding_model, expected_model
            ));
        }

        IndexState::Ready(file.chunks)
    }

    async fn persist(&self, chunks: &[IndexedChunk]) -> Result<(), RetrievalError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RetrievalError::Storage(format!("Failed to create index directory: {e}"))
            })?;
        }

        let file = IndexFile {
            version: FORMAT_VERSION,
            embedding_model: self.embedder.model().to_string(),
            built_at: Utc::now(),
            chunks: chunks.to_vec(),
        };
        let json = serde_json::to_vec(&file)
            .map_err(|e| RetrievalError::Storage(format!("Failed to serialize index: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Failed to write index file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Failed to replace index file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl VectorIndex for FileIndex {
    fn name(&self) -> &str {
        "file"
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let state = self.state.read().await;
        let chunks = match &*state {
            IndexState::Ready(chunks) => chunks,
            IndexState::Unavailable(reason) => {
                return Err(RetrievalError::IndexUnavailable(reason.clone()));
            }
        };
        if chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = embed_query(self.embedder.as_ref(), query).await?;
        Ok(vector_search(chunks, &query_embedding, k))
    }

    async fn sources(&self) -> Result<Vec<String>, RetrievalError> {
        match &*self.state.read().await {
            IndexState::Ready(chunks) => Ok(distinct_sources(chunks)),
            IndexState::Unavailable(reason) => Err(RetrievalError::IndexUnavailable(reason.clone())),
        }
    }

    async fn replace(&self, chunks: Vec<DocumentChunk>) -> Result<usize, RetrievalError> {
        let indexed = embed_chunks(self.embedder.as_ref(), chunks).await?;

        // Hold the write lock across the write so searches never mix old and new.
        let mut state = self.state.write().await;
        self.persist(&indexed).await?;
        let count = indexed.len();
        *state = IndexState::Ready(indexed);

        info!(path = %self.path.display(), count, "Vector index rebuilt");
        Ok(count)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        match &*self.state.read().await {
            IndexState::Ready(chunks) => Ok(chunks.len()),
            IndexState::Unavailable(reason) => Err(RetrievalError::IndexUnavailable(reason.clone())),
        }
    }
}
