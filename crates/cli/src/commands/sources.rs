//! `raglab sources`: List indexed source documents.

use std::path::PathBuf;

pub async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let index = super::open_index(&config).await?;
    let sources = super::ingestor(&config, index).list_sources().await;

    if sources.is_empty() {
        println!("Index is empty. Run `raglab ingest` first.");
    }
    for source in sources {
        println!("{source}");
    }

    Ok(())
}
