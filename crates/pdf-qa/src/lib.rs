//! pdf-qa: chat with uploaded PDFs using retrieval-augmented generation
//!
//! PDFs are split into overlapping chunks, embedded through Ollama and kept in
//! an in-memory index. Questions go through a conversational retrieval chain
//! that condenses follow-ups, retrieves the closest chunks and asks the LLM.

pub mod chain;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use chain::{ChainOptions, ChainOutput, ConversationMemory, ConversationalChain};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use retrieval::{SearchResult, VectorIndex};
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    query::{AskRequest, ChatTurn},
    response::{AskResponse, Citation, UploadResponse},
};
