//! `raglab config`: Configuration management commands.

use std::path::PathBuf;

use raglab_config::AppConfig;

const MASK: &str = "********";

/// Copy of `config` with secrets replaced, safe to print.
fn masked(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some(MASK.into());
    }
    if shown.embedding.api_key.is_some() {
        shown.embedding.api_key = Some(MASK.into());
    }
    shown
}

pub fn show(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    println!("{}", toml::to_string_pretty(&masked(&config))?);
    Ok(())
}

pub fn validate(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    println!("Config parsed and validated");

    if !config.has_api_key() {
        println!("   warning: no API key set (ANTHROPIC_API_KEY); `ask` and `/chat` will fail");
    }
    if !config.ingest.data_path.is_dir() {
        println!(
            "   warning: data directory {} does not exist",
            config.ingest.data_path.display()
        );
    }

    println!();
    println!("   Model:      {}", config.model);
    println!("   Retrieval:  k={} detail_k={}", config.retrieval.k, config.retrieval.detail_k);
    println!("   Rounds:     {}", config.agent.max_rounds);
    println!("   Embedding:  {:?} ({})", config.embedding.provider, config.embedding.model);
    println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);
    Ok(())
}

pub fn init() {
    print!("{}", AppConfig::default_toml());
}
