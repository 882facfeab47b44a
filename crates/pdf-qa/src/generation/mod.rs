//! Model server client and prompt templates

pub mod ollama;
pub mod prompt;

pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
