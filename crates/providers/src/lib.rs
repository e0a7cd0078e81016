//! Language-model and embedding providers for raglab.
//!
//! The generator talks to a `raglab_core::Provider`; the vector index talks
//! to a `raglab_core::Embedder`. This crate builds both from configuration.

pub mod anthropic;
pub mod hashing;
pub mod openai_embeddings;

pub use anthropic::AnthropicProvider;
pub use hashing::HashingEmbedder;
pub use openai_embeddings::OpenAiEmbedder;

use raglab_config::{AppConfig, EmbeddingProvider};
use raglab_core::error::{ProviderError, RetrievalError};
use raglab_core::{Embedder, Provider};
use std::sync::Arc;
use std::time::Duration;

/// Build the language-model provider from config.
///
/// Fails with `NotConfigured` when no Anthropic API key is present.
pub fn build_provider_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ProviderError::NotConfigured("ANTHROPIC_API_KEY is not set".into()))?;

    let provider =
        AnthropicProvider::new(api_key, Duration::from_secs(config.request_timeout_secs))?;
    tracing::debug!(model = %config.model, "Anthropic provider ready");
    Ok(Arc::new(provider))
}

/// Build the embedder that backs the vector index.
pub fn build_embedder_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn Embedder>, RetrievalError> {
    let embedding = &config.embedding;
    match embedding.provider {
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(embedding.dimensions))),
        EmbeddingProvider::Openai => {
            let api_key = embedding.api_key.clone().ok_or_else(|| {
                RetrievalError::EmbeddingFailed("OPENAI_API_KEY is not set".into())
            })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                &embedding.api_url,
                api_key,
                &embedding.model,
                Duration::from_secs(config.request_timeout_secs),
            )?))
        }
    }
}
