//! The response generator: retrieval, a bounded tool-use loop, and delivery.
//!
//! For each query:
//!
//! 1. **Retrieve** context once. No chunks means a single fixed fragment and
//!    no model call at all.
//! 2. **Loop** up to `max_rounds` non-streaming requests with tools offered.
//!    A finished round ends the loop; a tool request executes every
//!    invocation in order, then appends the assistant turn verbatim and one
//!    user turn holding the results.
//! 3. **Deliver** the finished round's text blocks, or, if the cap was hit
//!    while tools were still being requested, stream one final synthesis with
//!    no tools offered.
//!
//! Every request of a query carries the same system instruction. A tool
//! failure becomes an error-flagged result for that invocation only; model
//! and retrieval failures end the output sequence with an error.

use futures::stream::{self, BoxStream, StreamExt};
use raglab_config::AppConfig;
use raglab_core::message::{Conversation, Message};
use raglab_core::provider::{ChunkReceiver, Provider, ProviderRequest, RoundOutcome, ToolDefinition};
use raglab_core::tool::{ToolInvocation, ToolRegistry, ToolResult};
use raglab_core::Error;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::prompt::system_prompt;
use crate::retriever::{ContextRetriever, build_context, initial_user_turn};

/// Emitted instead of an answer when retrieval finds nothing.
pub const NO_DOCUMENTS_MESSAGE: &str = "No relevant documents found in the knowledge base.";

/// Lazy sequence of answer fragments.
pub type FragmentStream = BoxStream<'static, Result<String, Error>>;

/// Model-facing settings for the generator.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub model: String,
    pub max_tokens: u32,
    /// Tool-capable rounds before the forced synthesis
    pub max_rounds: u32,
    pub system_prompt: String,
}

impl GeneratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_rounds: config.agent.max_rounds,
            system_prompt: system_prompt(config.system_prompt_override.as_deref()),
        }
    }
}

/// How the answer reaches the caller.
enum Delivery {
    /// Fully known up front
    Fragments(Vec<String>),
    /// Forced synthesis, arriving incrementally
    Streaming(ChunkReceiver),
}

#[derive(Clone)]
pub struct ResponseGenerator {
    provider: Arc<dyn Provider>,
    retriever: Arc<ContextRetriever>,
    tools: Arc<ToolRegistry>,
    settings: Arc<GeneratorSettings>,
}

impl ResponseGenerator {
    pub fn new(
        provider: Arc<dyn Provider>,
        retriever: Arc<ContextRetriever>,
        tools: Arc<ToolRegistry>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            provider,
            retriever,
            tools,
            settings: Arc::new(settings),
        }
    }

    /// Answer `query` as a lazy fragment stream.
    ///
    /// Nothing runs until the stream is first polled, and dropping the stream
    /// abandons any in-flight retrieval, model call, or synthesis.
    pub fn generate(&self, query: impl Into<String>) -> FragmentStream {
        let this = self.clone();
        let query = query.into();

        stream::once(async move { this.run(&query).await })
            .flat_map(|delivery| match delivery {
                Ok(Delivery::Fragments(fragments)) => {
                    stream::iter(fragments.into_iter().map(Ok)).boxed()
                }
                Ok(Delivery::Streaming(rx)) => ReceiverStream::new(rx)
                    .filter_map(|chunk| async move {
                        match chunk {
                            Ok(chunk) => chunk.content.map(Ok),
                            Err(e) => Some(Err(Error::from(e))),
                        }
                    })
                    .boxed(),
                Err(e) => stream::once(async move { Err(e) }).boxed(),
            })
            .boxed()
    }

    async fn run(&self, query: &str) -> Result<Delivery, Error> {
        let chunks = self.retriever.retrieve(query).await?;
        if chunks.is_empty() {
            info!("No documents matched the query");
            return Ok(Delivery::Fragments(vec![NO_DOCUMENTS_MESSAGE.to_string()]));
        }

        let mut conversation = Conversation::new();
        conversation.push(Message::user(initial_user_turn(&build_context(&chunks), query)));

        let tool_definitions = self.tools.definitions();

        for round in 1..=self.settings.max_rounds {
            let response = self
                .provider
                .complete(self.request(&conversation, tool_definitions.clone()))
                .await?;

            match response.outcome() {
                RoundOutcome::Finished(texts) => {
                    debug!(round, blocks = texts.len(), "Model finished");
                    return Ok(Delivery::Fragments(texts));
                }
                RoundOutcome::ToolRequested(invocations) => {
                    debug!(round, tools = invocations.len(), "Model requested tools");
                    let results = self.execute_tools(&invocations).await;
                    conversation.push(Message::assistant_blocks(response.content));
                    conversation.push(Message::tool_results(results));
                }
            }
        }

        info!(
            rounds = self.settings.max_rounds,
            "Round cap reached, streaming final synthesis without tools"
        );
        let rx = self
            .provider
            .stream(self.request(&conversation, Vec::new()))
            .await?;
        Ok(Delivery::Streaming(rx))
    }

    /// Run each invocation in order. Failures become error-flagged results.
    async fn execute_tools(&self, invocations: &[ToolInvocation]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            let result = match self
                .tools
                .execute(&invocation.name, invocation.input.clone())
                .await
            {
                Ok(content) => ToolResult::success(&invocation.id, content),
                Err(e) => {
                    warn!(tool = %invocation.name, id = %invocation.id, error = %e, "Tool execution failed");
                    ToolResult::failure(&invocation.id, format!("Tool execution failed: {e}"))
                }
            };
            results.push(result);
        }
        results
    }

    fn request(&self, conversation: &Conversation, tools: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest {
            model: self.settings.model.clone(),
            system: self.settings.system_prompt.clone(),
            messages: conversation.messages().to_vec(),
            max_tokens: self.settings.max_tokens,
            tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use raglab_core::error::ProviderError;
    use raglab_core::message::{ContentBlock, Role};
    use raglab_core::retrieval::{RetrievedChunk, VectorIndex};
    use raglab_core::tool::Tool;

    const SYSTEM: &str = "You are a test assistant.";

    fn settings() -> GeneratorSettings {
        GeneratorSettings {
            model: "mock-model".into(),
            max_tokens: 4096,
            max_rounds: 2,
            system_prompt: SYSTEM.into(),
        }
    }

    fn portfolio_index() -> Arc<RecordingIndex> {
        Arc::new(RecordingIndex::with_chunks(vec![
            RetrievedChunk::new("Kurt Douglas Foundation: nonprofit site", "data/projects.md"),
            RetrievedChunk::new("Pawfect Pet Grooming: booking app", "data/projects.md"),
        ]))
    }

    fn generator_with(
        provider: Arc<ScriptedProvider>,
        index: Arc<RecordingIndex>,
        extra_tools: Vec<Box<dyn Tool>>,
    ) -> ResponseGenerator {
        let index: Arc<dyn VectorIndex> = index;
        let mut tools = raglab_tools::default_registry(index.clone(), 3);
        for tool in extra_tools {
            tools.register(tool);
        }
        ResponseGenerator::new(
            provider,
            Arc::new(ContextRetriever::new(index, 15)),
            Arc::new(tools),
            settings(),
        )
    }

    fn generator(provider: Arc<ScriptedProvider>) -> ResponseGenerator {
        generator_with(provider, portfolio_index(), vec![])
    }

    async fn collect(stream: FragmentStream) -> Result<Vec<String>, Error> {
        stream.collect::<Vec<_>>().await.into_iter().collect()
    }

    fn details(id: &'static str, title: &str) -> (&'static str, &'static str, serde_json::Value) {
        (id, "get_project_details", serde_json::json!({"project_title": title}))
    }

    #[tokio::test]
    async fn finished_first_round_yields_text_blocks() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response(&["Hello", " world"])]));

        let fragments = collect(generator(provider.clone()).generate("Who is she?")).await.unwrap();

        assert_eq!(fragments, ["Hello", " world"]);
        assert_eq!(provider.kinds(), [CallKind::Complete]);

        let (_, request) = &provider.requests()[0];
        assert_eq!(request.system, SYSTEM);
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.messages.len(), 1);
        let turn = request.messages[0].text().unwrap();
        assert!(turn.starts_with("Context:\n[1] (source: data/projects.md)\nKurt Douglas"));
        assert!(turn.ends_with("\n\nQuestion: Who is she?"));
    }

    #[tokio::test]
    async fn tool_round_then_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(&[details("toolu_1", "Kurt Douglas Foundation")]),
            text_response(&["### Technical Breakdown"]),
        ]));

        let fragments = collect(generator(provider.clone()).generate("KDF details")).await.unwrap();

        assert_eq!(fragments, ["### Technical Breakdown"]);
        assert_eq!(provider.kinds(), [CallKind::Complete, CallKind::Complete]);

        let (_, second) = &provider.requests()[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[1].role, Role::Assistant);
        assert!(matches!(
            &second.messages[1].blocks()[1],
            ContentBlock::ToolUse { id, .. } if id == "toolu_1"
        ));
        match second.messages[2].blocks() {
            [ContentBlock::ToolResult { tool_use_id, content, is_error }] => {
                assert_eq!(tool_use_id, "toolu_1");
                assert!(!is_error);
                assert!(content.starts_with("(source: data/projects.md)\n"));
            }
            other => panic!("unexpected tool results: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cap_hit_forces_streaming_synthesis_without_tools() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![
                tool_response(&[details("toolu_1", "KDF")]),
                tool_response(&[details("toolu_2", "Pawfect")]),
            ])
            .with_stream(&["Final ", "answer"]),
        );

        let fragments = collect(generator(provider.clone()).generate("Compare")).await.unwrap();

        assert_eq!(fragments, ["Final ", "answer"]);
        assert_eq!(
            provider.kinds(),
            [CallKind::Complete, CallKind::Complete, CallKind::Stream]
        );

        let requests = provider.requests();
        let (_, synthesis) = &requests[2];
        assert!(synthesis.tools.is_empty());
        assert_eq!(synthesis.messages.len(), 5);
        assert!(requests.iter().all(|(_, r)| r.system == SYSTEM));

        let result_ids: Vec<&str> = [&synthesis.messages[2], &synthesis.messages[4]]
            .into_iter()
            .map(|turn| {
                assert_eq!(turn.role, Role::User);
                match turn.blocks() {
                    [ContentBlock::ToolResult { tool_use_id, is_error: false, .. }] => {
                        tool_use_id.as_str()
                    }
                    other => panic!("expected one tool result, got {other:?}"),
                }
            })
            .collect();
        assert_eq!(result_ids, ["toolu_1", "toolu_2"]);
        assert!(synthesis.messages[1].blocks().iter().any(
            |b| matches!(b, ContentBlock::ToolUse { id, .. } if id == "toolu_1")
        ));
        assert!(synthesis.messages[3].blocks().iter().any(
            |b| matches!(b, ContentBlock::ToolUse { id, .. } if id == "toolu_2")
        ));
    }

    #[tokio::test]
    async fn tool_failures_are_isolated_per_invocation() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(&[
                ("toolu_a", "flaky_lookup", serde_json::json!({})),
                details("toolu_b", "KDF"),
                ("toolu_c", "not_a_tool", serde_json::json!({})),
            ]),
            text_response(&["done"]),
        ]));
        let generator = generator_with(provider.clone(), portfolio_index(), vec![Box::new(FailingTool)]);

        let fragments = collect(generator.generate("q")).await.unwrap();
        assert_eq!(fragments, ["done"]);

        let (_, second) = &provider.requests()[1];
        let results: Vec<_> = second.messages[2]
            .blocks()
            .iter()
            .map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                    (tool_use_id.clone(), content.clone(), *is_error)
                }
                other => panic!("unexpected block {other:?}"),
            })
            .collect();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "toolu_a");
        assert!(results[0].2);
        assert_eq!(results[0].1, "Tool execution failed: flaky_lookup failed: upstream timed out");
        assert_eq!(results[1].0, "toolu_b");
        assert!(!results[1].2);
        assert_eq!(results[2], ("toolu_c".into(), "Unknown tool: not_a_tool".into(), false));
    }

    #[tokio::test]
    async fn empty_retrieval_short_circuits() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let index = Arc::new(RecordingIndex::empty());
        let generator = generator_with(provider.clone(), index.clone(), vec![]);

        let fragments = collect(generator.generate("anything")).await.unwrap();

        assert_eq!(fragments, [NO_DOCUMENTS_MESSAGE]);
        assert!(provider.requests().is_empty());
        assert_eq!(index.searches(), [("anything".to_string(), 15)]);
    }

    #[tokio::test]
    async fn nothing_runs_until_polled() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response(&["hi"])]));
        let index = portfolio_index();
        let stream = generator_with(provider.clone(), index.clone(), vec![]).generate("q");

        assert!(index.searches().is_empty());
        drop(stream);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_ends_stream_with_error() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Network(
            "connection reset".into(),
        )));

        let items: Vec<_> = generator(provider).generate("q").collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Provider(ProviderError::Network(_)))));
    }

    #[tokio::test]
    async fn synthesis_error_follows_partial_fragments() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![
                tool_response(&[details("toolu_1", "KDF")]),
                tool_response(&[details("toolu_2", "KDF")]),
            ])
            .with_stream(&["partial"])
            .with_stream_error(ProviderError::StreamInterrupted("reset".into())),
        );

        let items: Vec<_> = generator(provider).generate("q").collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().ok(), Some("partial"));
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn single_round_cap_streams_after_first_tool_round() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![tool_response(&[details("toolu_1", "KDF")])])
                .with_stream(&["synth"]),
        );
        let mut generator = generator(provider.clone());
        generator.settings = Arc::new(GeneratorSettings {
            max_rounds: 1,
            ..settings()
        });

        let fragments = collect(generator.generate("q")).await.unwrap();
        assert_eq!(fragments, ["synth"]);
        assert_eq!(provider.kinds(), [CallKind::Complete, CallKind::Stream]);
    }
}
