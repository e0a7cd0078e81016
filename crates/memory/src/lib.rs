//! Vector index implementations and document ingestion for raglab.

pub mod file_index;
pub mod in_memory;
pub mod ingest;
pub mod splitter;
pub mod vector;

pub use file_index::FileIndex;
pub use in_memory::InMemoryIndex;
pub use ingest::{IngestReport, IngestStatus, Ingestor, SourceDocument, load_documents};
pub use splitter::TextSplitter;
pub use vector::{IndexedChunk, cosine_similarity, vector_search};
