//! `raglab serve`: Start the HTTP gateway.

use std::path::PathBuf;

pub async fn run(
    config_path: Option<PathBuf>,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    println!("raglab gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model);
    println!("   Index:     {}", config.ingest.index_path.display());

    raglab_gateway::start(config).await
}
