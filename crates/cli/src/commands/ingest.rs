//! `raglab ingest`: Rebuild the vector index from the data directory.

use std::path::PathBuf;

use raglab_memory::IngestStatus;

pub async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let index = super::open_index(&config).await?;
    let report = super::ingestor(&config, index).ingest().await?;

    match report.status {
        IngestStatus::NoDocuments => {
            println!(
                "No documents found in {}. Add .txt or .md files and re-run.",
                config.ingest.data_path.display()
            );
        }
        IngestStatus::Ok => {
            println!("Indexed {} chunks:", report.chunks);
            for source in report.sources.unwrap_or_default() {
                println!("  {source}");
            }
        }
    }

    Ok(())
}
