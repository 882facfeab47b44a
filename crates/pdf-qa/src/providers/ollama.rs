//! Ollama-based providers for embeddings and LLM
//!
//! Wraps the OllamaClient to implement the provider traits.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::OllamaClient;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama embedding provider using all-minilm or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    dimensions: usize,
    /// Maximum in-flight embedding requests during batch calls
    concurrency: usize,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, config: &RagConfig) -> Self {
        Self {
            client,
            model: config.embeddings.model.clone(),
            dimensions: config.embeddings.dimensions,
            concurrency: config.processing.embedding_concurrency(),
        }
    }

    /// Embedding model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama embeds one prompt per request; `buffered` keeps input order
        let requests: Vec<_> = texts
            .iter()
            .map(|text| self.client.embed(&self.model, text))
            .collect();

        stream::iter(requests)
            .buffered(self.concurrency.max(1))
            .try_collect()
            .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Combined Ollama provider that shares a single client for both embeddings and LLM
pub struct OllamaProvider {
    embedder: OllamaEmbedder,
    llm: OllamaLlm,
}

impl OllamaProvider {
    /// Create a new combined Ollama provider
    pub fn new(config: &RagConfig) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(&config.llm)?);
        Ok(Self {
            embedder: OllamaEmbedder::from_client(Arc::clone(&client), config),
            llm: OllamaLlm::from_client(client, config.llm.generate_model.clone()),
        })
    }

    /// Split into separate providers
    pub fn split(self) -> (OllamaEmbedder, OllamaLlm) {
        (self.embedder, self.llm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::time::Duration;

    /// Local `/api/embeddings` endpoint: shorter prompts answer later, so
    /// completions arrive in reverse input order.
    async fn embeddings_server() -> String {
        async fn embeddings(Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
            let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
            let delay = 200u64.saturating_sub(prompt.len() as u64 * 40);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Json(serde_json::json!({ "embedding": [prompt.len() as f32, 1.0] }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/api/embeddings", post(embeddings));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_provider_takes_models_from_config() {
        let mut config = RagConfig::default();
        config.embeddings.model = "nomic-embed-text".to_string();
        config.embeddings.dimensions = 768;
        config.llm.generate_model = "llama3".to_string();

        let (embedder, llm) = OllamaProvider::new(&config).unwrap().split();
        assert_eq!(embedder.model(), "nomic-embed-text");
        assert_eq!(embedder.dimensions(), 768);
        assert_eq!(llm.model(), "llama3");
        assert_eq!(llm.name(), "ollama");
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_requests() {
        let mut config = RagConfig::default();
        config.llm.base_url = "http://127.0.0.1:1".to_string();
        let (embedder, _) = OllamaProvider::new(&config).unwrap().split();

        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let mut config = RagConfig::default();
        config.llm.base_url = embeddings_server().await;
        config.processing.parallel_embeddings = Some(4);
        let (embedder, _) = OllamaProvider::new(&config).unwrap().split();

        let texts: Vec<String> = ["a", "bb", "ccc", "dddd"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let embeddings = embedder.embed_batch(&texts).await.unwrap();

        let lengths: Vec<f32> = embeddings.iter().map(|e| e[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
