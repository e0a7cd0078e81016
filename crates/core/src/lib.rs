//! # raglab Core
//!
//! Domain types, traits, and error definitions for the raglab
//! retrieval-augmented answering backend. This crate has **no framework
//! dependencies**: it defines the domain model that all other crates
//! implement against.
//!
//! Every external collaborator (language model, vector index, embedder,
//! tools) is a trait here. Implementations live in their respective crates,
//! so tests can swap in scripted stand-ins.

pub mod error;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ContentBlock, Conversation, Message, MessageContent, Role};
pub use provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, RoundOutcome, StopReason,
    StreamChunk, ToolDefinition, Usage,
};
pub use retrieval::{CHUNK_DELIMITER, DocumentChunk, Embedder, RetrievedChunk, VectorIndex};
pub use tool::{Tool, ToolInvocation, ToolRegistry, ToolResult};
