//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks
//! - Streaming via SSE with `content_block_delta` events

use async_trait::async_trait;
use futures::StreamExt;
use raglab_core::error::ProviderError;
use raglab_core::message::ContentBlock;
use raglab_core::provider::*;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider whose requests time out after `timeout`.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the Messages API request body.
    ///
    /// Turns serialize as-is: their block layout already matches the wire format.
    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "system": request.system,
            "messages": request.messages,
            "max_tokens": request.max_tokens,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools);
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }

        body
    }

    async fn send(
        &self,
        body: &serde_json::Value,
        stream: bool,
    ) -> std::result::Result<reqwest::Response, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }

    /// Convert Anthropic API response to our ProviderResponse.
    fn response_to_provider_response(resp: AnthropicResponse) -> ProviderResponse {
        let content = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                ResponseContentBlock::Unsupported => None,
            })
            .collect();

        ProviderResponse {
            id: resp.id,
            model: resp.model,
            content,
            stop_reason: resp.stop_reason.unwrap_or(StopReason::EndTurn),
            usage: Some(Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            }),
        }
    }
}

#[async_trait]
impl raglab_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = Self::request_body(&request, false);

        debug!(
            provider = "anthropic",
            model = %request.model,
            turns = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self.send(&body, false).await?;

        let api_resp: AnthropicResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(format!(
                    "Failed to parse Anthropic response: {e}"
                )))?;

        Ok(Self::response_to_provider_response(api_resp))
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let body = Self::request_body(&request, true);

        debug!(provider = "anthropic", model = %request.model, "Sending streaming request");

        let response = self.send(&body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Dropping the receiver makes the next send fail, which ends this task
        // and drops the upstream response with it.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = SseLineBuffer::default();
            let mut input_tokens = 0u32;

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    let Some(event) = parse_sse_line(&line) else {
                        continue;
                    };

                    let chunk = match event {
                        SseEvent::MessageStart { input_tokens: n } => {
                            input_tokens = n;
                            continue;
                        }
                        SseEvent::TextDelta(text) => StreamChunk {
                            content: Some(text),
                            ..StreamChunk::default()
                        },
                        SseEvent::MessageDelta { output_tokens } => StreamChunk {
                            usage: Some(Usage {
                                input_tokens,
                                output_tokens,
                            }),
                            ..StreamChunk::default()
                        },
                        SseEvent::MessageStop => {
                            let _ = tx
                                .send(Ok(StreamChunk {
                                    done: true,
                                    ..StreamChunk::default()
                                }))
                                .await;
                            return;
                        }
                        SseEvent::Error(message) => {
                            let _ = tx.send(Err(ProviderError::StreamInterrupted(message))).await;
                            return;
                        }
                    };

                    if tx.send(Ok(chunk)).await.is_err() {
                        debug!("Stream receiver dropped, abandoning upstream response");
                        return;
                    }
                }
            }

            // Stream ended without message_stop
            let _ = tx
                .send(Err(ProviderError::StreamInterrupted(
                    "stream ended before message_stop".into(),
                )))
                .await;
        });

        Ok(rx)
    }
}

// --- SSE decoding ---

/// Splits a byte stream into complete lines, holding back any partial tail.
///
/// Bytes are buffered raw and decoded one whole line at a time, so a
/// multi-byte character cut across network chunks survives intact.
#[derive(Debug, Default)]
struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8(line)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
            lines.push(line);
        }
        lines
    }
}

/// The stream events the final synthesis cares about.
#[derive(Debug, Clone, PartialEq)]
enum SseEvent {
    MessageStart { input_tokens: u32 },
    TextDelta(String),
    MessageDelta { output_tokens: u32 },
    MessageStop,
    Error(String),
}

/// Decode one SSE line. `event:` lines are redundant with the JSON `type`
/// field and are skipped, as are comments and blank separators.
fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }

    let event: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            trace!(error = %e, data = %data, "Ignoring unparseable Anthropic SSE");
            return None;
        }
    };

    match event["type"].as_str().unwrap_or("") {
        "message_start" => Some(SseEvent::MessageStart {
            input_tokens: event["message"]["usage"]["input_tokens"]
                .as_u64()
                .unwrap_or(0) as u32,
        }),
        "content_block_delta" => {
            let delta = &event["delta"];
            match delta["type"].as_str() {
                Some("text_delta") => delta["text"]
                    .as_str()
                    .filter(|t| !t.is_empty())
                    .map(|t| SseEvent::TextDelta(t.to_string())),
                _ => None,
            }
        }
        "message_delta" => event["usage"]["output_tokens"]
            .as_u64()
            .map(|n| SseEvent::MessageDelta {
                output_tokens: n as u32,
            }),
        "message_stop" => Some(SseEvent::MessageStop),
        "error" => Some(SseEvent::Error(
            event["error"]["message"]
                .as_str()
                .unwrap_or("unknown stream error")
                .to_string(),
        )),
        _ => None,
    }
}

// --- Anthropic API types ---

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<StopReason>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
