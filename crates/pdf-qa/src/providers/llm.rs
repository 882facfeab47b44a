//! LLM provider trait for prompt completion

use async_trait::async_trait;

use crate::error::Result;

/// Trait for LLM-based text generation
///
/// The retrieval chain builds complete prompts and hands them over as-is.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
