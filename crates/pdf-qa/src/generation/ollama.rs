//! Ollama client for embeddings and text generation with retry logic

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Upper bound on the wait between retries
const MAX_BACKOFF_SECS: u64 = 30;

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    num_ctx: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempt < max_retries {
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            "Request failed (attempt {}/{}): {}, retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            e,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let request = self.authorized(self.client.get(self.url("/api/tags")));

        match request.send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = &self.url("/api/embeddings");

        self.retry_request(|| async move {
            let request = EmbedRequest { model, prompt: text };

            let response = self
                .authorized(self.client.post(url))
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {} - {}",
                    status, body
                )));
            }

            let embed_response: EmbedResponse = response
                .json()
                .await
                .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

            if embed_response.embedding.is_empty() {
                return Err(Error::embedding(format!("Model '{}' returned an empty embedding", model)));
            }

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Generate a completion for a raw prompt with retry
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = &self.url("/api/generate");
        let model = self.config.generate_model.as_str();

        tracing::debug!("Generating with model {} ({} prompt chars)", model, prompt.len());

        self.retry_request(|| async move {
            let request = GenerateRequest {
                model,
                prompt,
                stream: false,
                options: GenerateOptions {
                    temperature: self.config.temperature,
                    num_predict: self.config.num_predict,
                    num_ctx: self.config.context_size,
                },
            };

            let response = self
                .authorized(self.client.post(url))
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::llm(format!(
                    "Generation failed: HTTP {} - {}",
                    status, body
                )));
            }

            let generate_response: GenerateResponse = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse generation response: {}", e)))?;

            Ok(generate_response.response)
        })
        .await
    }
}

/// Exponential backoff: 1s, 2s, 4s, ... capped at `MAX_BACKOFF_SECS`
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS))
}
