pub mod ask;
pub mod config_cmd;
pub mod ingest;
pub mod serve;
pub mod sources;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

use raglab_config::AppConfig;
use raglab_core::retrieval::VectorIndex;
use raglab_memory::{FileIndex, Ingestor, TextSplitter};

pub(crate) fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    AppConfig::load_with(path).context("Failed to load config")
}

pub(crate) async fn open_index(config: &AppConfig) -> anyhow::Result<Arc<dyn VectorIndex>> {
    let embedder = raglab_providers::build_embedder_from_config(config)?;
    Ok(Arc::new(
        FileIndex::open(&config.ingest.index_path, embedder).await,
    ))
}

pub(crate) fn ingestor(config: &AppConfig, index: Arc<dyn VectorIndex>) -> Ingestor {
    Ingestor::new(
        index,
        TextSplitter::new(config.ingest.chunk_size, config.ingest.chunk_overlap),
        &config.ingest.data_path,
    )
}
