//! Document ingestion: load `.txt` / `.md` files from the data directory,
//! split them into chunks, and rebuild the vector index from scratch.

use raglab_core::error::RetrievalError;
use raglab_core::retrieval::{DocumentChunk, VectorIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::splitter::TextSplitter;

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// A loaded source document.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Path the document was read from; becomes the chunk `source_id`
    pub source_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Ok,
    NoDocuments,
}

/// Outcome of an ingest run, serialized as the `/ingest` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub status: IngestStatus,
    pub chunks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl IngestReport {
    pub fn no_documents() -> Self {
        Self {
            status: IngestStatus::NoDocuments,
            chunks: 0,
            sources: None,
        }
    }
}

pub struct Ingestor {
    index: Arc<dyn VectorIndex>,
    splitter: TextSplitter,
    data_path: PathBuf,
}

impl Ingestor {
    pub fn new(index: Arc<dyn VectorIndex>, splitter: TextSplitter, data_path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            splitter,
            data_path: data_path.into(),
        }
    }

    /// Rebuild the index from the data directory.
    ///
    /// With no loadable documents the existing index is left untouched.
    pub async fn ingest(&self) -> Result<IngestReport, RetrievalError> {
        let documents = load_documents(&self.data_path).await?;
        if documents.is_empty() {
            info!(path = %self.data_path.display(), "No documents to ingest");
            return Ok(IngestReport::no_documents());
        }

        let chunks: Vec<DocumentChunk> = documents
            .iter()
            .flat_map(|doc| {
                self.splitter.split(&doc.text).into_iter().map(move |text| DocumentChunk {
                    text,
                    source_id: doc.source_id.clone(),
                })
            })
            .collect();

        let sources: Vec<String> = documents
            .into_iter()
            .map(|d| d.source_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let stored = self.index.replace(chunks).await?;
        info!(chunks = stored, sources = sources.len(), "Ingest complete");

        Ok(IngestReport {
            status: IngestStatus::Ok,
            chunks: stored,
            sources: Some(sources),
        })
    }

    /// Distinct sources currently indexed, sorted. Failures read as empty.
    pub async fn list_sources(&self) -> Vec<String> {
        match self.index.sources().await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "Failed to list indexed sources");
                Vec::new()
            }
        }
    }
}

/// Recursively load every `.txt` / `.md` file under `root`, in path order.
///
/// A missing root yields no documents. Unreadable or non-UTF-8 files are
/// skipped with a warning.
pub async fn load_documents(root: &Path) -> Result<Vec<SourceDocument>, RetrievalError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(RetrievalError::Storage(format!(
                    "Failed to read {}: {e}",
                    dir.display()
                )));
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RetrievalError::Storage(format!("Failed to read {}: {e}", dir.display())))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| RetrievalError::Storage(e.to_string()))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if is_text_document(&path) {
                files.push(path);
            } else if path.extension().is_some_and(|e| e == "pdf") {
                warn!(path = %path.display(), "PDF documents are not supported, skipping");
            }
        }
    }

    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(path = %path.display(), bytes = text.len(), "Loaded document");
                documents.push(SourceDocument {
                    source_id: path.display().to_string(),
                    text,
                });
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
        }
    }

    Ok(documents)
}

fn is_text_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| TEXT_EXTENSIONS.contains(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryIndex;
    use raglab_providers::HashingEmbedder;

    fn ingestor(data: &Path) -> (Ingestor, Arc<dyn VectorIndex>) {
        let index: Arc<dyn VectorIndex> =
            Arc::new(InMemoryIndex::new(Arc::new(HashingEmbedder::new(64))));
        (
            Ingestor::new(index.clone(), TextSplitter::new(1000, 200), data),
            index,
        )
    }

    #[tokio::test]
    async fn loads_text_and_markdown_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("projects")).unwrap();
        std::fs::write(dir.path().join("about.md"), "# About").unwrap();
        std::fs::write(dir.path().join("projects/kdf.txt"), "KDF notes").unwrap();
        std::fs::write(dir.path().join("resume.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let docs = load_documents(dir.path()).await.unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|d| Path::new(&d.source_id).file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["about.md", "kdf.txt"]);
        assert_eq!(docs[1].text, "KDF notes");
    }

    #[tokio::test]
    async fn missing_data_dir_is_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, index) = ingestor(&dir.path().join("absent"));
        index
            .replace(vec![DocumentChunk {
                text: "keep me".into(),
                source_id: "data/old.md".into(),
            }])
            .await
            .unwrap();

        let report = ingestor.ingest().await.unwrap();
        assert_eq!(report, IngestReport::no_documents());
        assert_eq!(index.count().await.unwrap(), 1);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"status": "no_documents", "chunks": 0})
        );
    }

    #[tokio::test]
    async fn ingest_replaces_index_and_reports_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "Second document").unwrap();
        std::fs::write(dir.path().join("a.txt"), "First document").unwrap();
        let (ingestor, index) = ingestor(dir.path());

        let first = ingestor.ingest().await.unwrap();
        let second = ingestor.ingest().await.unwrap();

        assert_eq!(second.status, IngestStatus::Ok);
        assert_eq!(second.chunks, 2);
        assert_eq!(first, second);
        assert_eq!(index.count().await.unwrap(), 2);

        let sources = second.sources.unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].ends_with("a.txt"));
        assert_eq!(ingestor.list_sources().await, sources);

        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["chunks"], 2);
    }
}
