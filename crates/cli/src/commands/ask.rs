//! `raglab ask`: Answer one question, streaming fragments to stdout.

use anyhow::bail;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use raglab_agent::{ContextRetriever, GeneratorSettings, ResponseGenerator};

pub async fn run(config_path: Option<PathBuf>, query: String) -> anyhow::Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }

    let config = super::load_config(config_path)?;
    if !config.has_api_key() {
        bail!("No API key configured. Set ANTHROPIC_API_KEY or add api_key to raglab.toml.");
    }

    let provider = raglab_providers::build_provider_from_config(&config)?;
    let index = super::open_index(&config).await?;
    let retriever = Arc::new(ContextRetriever::new(index.clone(), config.retrieval.k));
    let tools = Arc::new(raglab_tools::default_registry(index, config.retrieval.detail_k));
    let generator = ResponseGenerator::new(
        provider,
        retriever,
        tools,
        GeneratorSettings::from_config(&config),
    );

    debug!(model = %config.model, k = config.retrieval.k, "Answering from the command line");
    let mut fragments = generator.generate(query);
    let mut stdout = std::io::stdout();
    while let Some(fragment) = fragments.next().await {
        stdout.write_all(fragment?.as_bytes())?;
        stdout.flush()?;
    }
    println!();

    Ok(())
}
