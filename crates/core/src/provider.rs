//! Provider trait: the abstraction over the language-model endpoint.
//!
//! A Provider sends a conversation plus a system instruction to an LLM and
//! gets a response back, either as a complete message (one agentic round) or
//! as a stream of text fragments (the forced final synthesis).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ContentBlock, Message};
use crate::tool::ToolInvocation;

/// A single model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "claude-sonnet-4-6")
    pub model: String,

    /// System instruction, sent as a top-level field
    pub system: String,

    /// The conversation turns
    pub messages: Vec<Message>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Tools the model may call. Empty means no tool capability is offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's input
    pub input_schema: serde_json::Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    #[serde(other)]
    Other,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Provider-assigned message ID
    pub id: String,

    /// Which model actually responded
    pub model: String,

    /// Raw content blocks, in the order produced
    pub content: Vec<ContentBlock>,

    /// Stop condition for this round
    pub stop_reason: StopReason,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    /// Classify this response into the round's outcome.
    ///
    /// A `tool_use` stop without any tool-use blocks has nothing to execute and
    /// is treated as finished.
    pub fn outcome(&self) -> RoundOutcome {
        match self.stop_reason {
            StopReason::ToolUse => {
                let invocations: Vec<ToolInvocation> =
                    self.content.iter().filter_map(ContentBlock::as_invocation).collect();
                if invocations.is_empty() {
                    RoundOutcome::Finished(self.text_blocks())
                } else {
                    RoundOutcome::ToolRequested(invocations)
                }
            }
            StopReason::EndTurn
            | StopReason::MaxTokens
            | StopReason::StopSequence
            | StopReason::Other => RoundOutcome::Finished(self.text_blocks()),
        }
    }

    fn text_blocks(&self) -> Vec<String> {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .map(str::to_string)
            .collect()
    }
}

/// The model's stop condition for one round.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// The model answered; these are its text blocks in order.
    Finished(Vec<String>),
    /// The model wants these tools run, in this order.
    ToolRequested(Vec<ToolInvocation>),
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial text delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only near the end)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Receiving half of a streaming response.
pub type ChunkReceiver =
    tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// The response generator calls `complete()` for every tool-capable round and
/// `stream()` for the final synthesis, without knowing which backend is used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the text as a single chunk.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let text: String = response
            .content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect();
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(text),
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}
