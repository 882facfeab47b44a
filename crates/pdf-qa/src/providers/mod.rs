//! Provider abstractions for embeddings and LLM
//!
//! The chain and server only see the traits, so backends can be swapped
//! without touching retrieval code.

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm, OllamaProvider};

#[cfg(test)]
pub(crate) mod testing;
