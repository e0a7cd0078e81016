//! OpenAI-compatible embeddings client.
//!
//! Posts to `{base_url}/embeddings` with Bearer auth. Works with OpenAI and
//! any server exposing the same endpoint.

use async_trait::async_trait;
use raglab_core::error::RetrievalError;
use raglab_core::retrieval::Embedder;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Inputs per request. Large ingests are split into several calls.
const BATCH_SIZE: usize = 96;

pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::EmbeddingFailed(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "input": inputs,
            "encoding_format": "float",
        });

        debug!(model = %self.model, count = inputs.len(), "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::EmbeddingFailed(format!(
                "embedding API returned {status}: {error_body}"
            )));
        }

        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            RetrievalError::EmbeddingFailed(format!("Failed to parse embedding response: {e}"))
        })?;

        Self::into_vectors(api_resp, inputs.len())
    }

    /// Order vectors by their reported index and check the count.
    fn into_vectors(
        mut resp: EmbeddingApiResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if resp.data.len() != expected {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "expected {expected} embeddings, got {}",
                resp.data.len()
            )));
        }
        resp.data.sort_by_key(|d| d.index);
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let mut vectors = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
