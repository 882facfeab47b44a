//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text embeddings
///
/// `OllamaEmbedder` talks to a local Ollama server. Tests plug in
/// deterministic embedders through the same seam.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get embedding dimensions (384 for all-minilm)
    fn dimensions(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
