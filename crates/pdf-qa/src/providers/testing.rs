//! Deterministic providers for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Bag-of-words embedder; texts sharing words land close together
///
/// Each new lowercase word claims the next free dimension.
pub struct StubEmbedder {
    dimensions: usize,
    /// Value returned by `dimensions()`; differs from real output when misreporting
    reported: usize,
    fail: bool,
    vocabulary: Mutex<HashMap<String, usize>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: 256,
            reported: 256,
            fail: false,
            vocabulary: Mutex::new(HashMap::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Embeds as usual but advertises a different dimension
    pub fn misreporting(reported: usize) -> Self {
        Self {
            reported,
            ..Self::new()
        }
    }

    fn slot(&self, word: &str) -> usize {
        let mut vocabulary = self.vocabulary.lock();
        let next = vocabulary.len();
        *vocabulary.entry(word.to_string()).or_insert(next) % self.dimensions
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(Error::embedding("embedder offline"));
        }
        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.slot(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.reported
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// LLM that records prompts and replies with canned text
pub struct StubLlm {
    answer: String,
    rephrased: String,
    prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn new(answer: &str, rephrased: &str) -> Self {
        Self {
            answer: answer.to_string(),
            rephrased: rephrased.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if prompt.ends_with("Standalone question:") {
            Ok(self.rephrased.clone())
        } else {
            Ok(self.answer.clone())
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}
