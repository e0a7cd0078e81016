//! Shared test helpers for generator tests.

use async_trait::async_trait;
use raglab_core::error::{ProviderError, RetrievalError, ToolError};
use raglab_core::message::ContentBlock;
use raglab_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StopReason, StreamChunk, Usage,
};
use raglab_core::retrieval::{DocumentChunk, RetrievedChunk, VectorIndex};
use raglab_core::tool::Tool;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Which provider entry point a request went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Complete,
    Stream,
}

/// A mock provider that returns scripted responses and records every request.
///
/// Each call to `complete` pops the next scripted response. `stream` replays
/// the scripted fragments, then an optional error. Panics if `complete` is
/// called more times than responses were provided.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    fragments: Vec<String>,
    stream_error: Option<ProviderError>,
    requests: Mutex<Vec<(CallKind, ProviderRequest)>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            fragments: Vec::new(),
            stream_error: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose first `complete` call fails.
    pub fn failing(error: ProviderError) -> Self {
        let provider = Self::new(vec![]);
        provider.responses.lock().unwrap().push_back(Err(error));
        provider
    }

    /// Fragments delivered by `stream`.
    pub fn with_stream(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|f| f.to_string()).collect();
        self
    }

    /// End the stream with this error after the fragments.
    pub fn with_stream_error(mut self, error: ProviderError) -> Self {
        self.stream_error = Some(error);
        self
    }

    pub fn requests(&self) -> Vec<(CallKind, ProviderRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<CallKind> {
        self.requests().into_iter().map(|(kind, _)| kind).collect()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push((CallKind::Complete, request));
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| panic!("ScriptedProvider: no more responses"))
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        self.requests.lock().unwrap().push((CallKind::Stream, request));

        let (tx, rx) = tokio::sync::mpsc::channel(self.fragments.len() + 2);
        for fragment in &self.fragments {
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(fragment.clone()),
                    ..StreamChunk::default()
                }))
                .await;
        }
        let last = match &self.stream_error {
            Some(e) => Err(e.clone()),
            None => Ok(StreamChunk {
                done: true,
                ..StreamChunk::default()
            }),
        };
        let _ = tx.send(last).await;
        Ok(rx)
    }
}

/// A finished response carrying these text blocks.
pub fn text_response(texts: &[&str]) -> ProviderResponse {
    response(
        StopReason::EndTurn,
        texts.iter().map(|t| ContentBlock::text(*t)).collect(),
    )
}

/// A tool-use response: optional preamble text, then one block per `(id, name, input)`.
pub fn tool_response(calls: &[(&str, &str, serde_json::Value)]) -> ProviderResponse {
    let mut content = vec![ContentBlock::text("Let me look that up.")];
    content.extend(calls.iter().map(|(id, name, input)| ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input: input.clone(),
    }));
    response(StopReason::ToolUse, content)
}

fn response(stop_reason: StopReason, content: Vec<ContentBlock>) -> ProviderResponse {
    ProviderResponse {
        id: "msg_mock".into(),
        model: "mock-model".into(),
        content,
        stop_reason,
        usage: Some(Usage {
            input_tokens: 10,
            output_tokens: 5,
        }),
    }
}

/// An index returning fixed chunks and recording each search.
pub struct RecordingIndex {
    chunks: Vec<RetrievedChunk>,
    searches: Mutex<Vec<(String, usize)>>,
}

impl RecordingIndex {
    pub fn with_chunks(chunks: Vec<RetrievedChunk>) -> Self {
        Self {
            chunks,
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_chunks(vec![])
    }

    pub fn searches(&self) -> Vec<(String, usize)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    fn name(&self) -> &str {
        "recording"
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        self.searches.lock().unwrap().push((query.to_string(), k));
        Ok(self.chunks.iter().take(k).cloned().collect())
    }

    async fn sources(&self) -> Result<Vec<String>, RetrievalError> {
        Ok(self.chunks.iter().map(|c| c.source_id.clone()).collect())
    }

    async fn replace(&self, _chunks: Vec<DocumentChunk>) -> Result<usize, RetrievalError> {
        Ok(0)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.chunks.len())
    }
}

/// A tool that always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky_lookup"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _input: serde_json::Value) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "flaky_lookup".into(),
            reason: "upstream timed out".into(),
        })
    }
}
