//! Answer generation for raglab.
//!
//! A query flows **Retrieve → Round loop → Deliver**:
//!
//! 1. **Retrieve** the most similar chunks once, up front
//! 2. **Round loop**: send the conversation with tools offered; if the model
//!    asks for tools, run them and loop, up to the round cap
//! 3. **Deliver** the finished text, or stream a forced tool-free synthesis
//!    when the cap was reached
//!
//! The output is a lazy stream of text fragments for the transport layer.

pub mod generator;
pub mod prompt;
pub mod retriever;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use generator::{FragmentStream, GeneratorSettings, NO_DOCUMENTS_MESSAGE, ResponseGenerator};
pub use prompt::{SYSTEM_PROMPT, system_prompt};
pub use retriever::{ContextRetriever, DEFAULT_RETRIEVAL_K, build_context, initial_user_turn};
