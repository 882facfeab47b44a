//! Conversational retrieval chain
//!
//! A follow-up question is first condensed into a standalone question using
//! the conversation so far, then answered from the top retrieved chunks.

mod memory;

pub use memory::ConversationMemory;

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{MemoryConfig, RagConfig};
use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::{SearchResult, VectorIndex};
use crate::types::ChatTurn;

/// Chain settings
#[derive(Debug, Clone)]
pub struct ChainOptions {
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Condense follow-ups into standalone questions
    pub rephrase_question: bool,
    pub memory: MemoryConfig,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            top_k: 2,
            rephrase_question: true,
            memory: MemoryConfig::default(),
        }
    }
}

impl From<&RagConfig> for ChainOptions {
    fn from(config: &RagConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            rephrase_question: config.retrieval.rephrase_question,
            memory: config.memory.clone(),
        }
    }
}

/// Result of one chain invocation
#[derive(Debug, Clone)]
pub struct ChainOutput {
    pub answer: String,
    /// Standalone question, present when the follow-up was rephrased
    pub generated_question: Option<String>,
    /// Retrieved chunks, best first
    pub source_chunks: Vec<SearchResult>,
}

/// Retrieval chain bound to one index and its conversation memory
pub struct ConversationalChain {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    options: ChainOptions,
    memory: RwLock<ConversationMemory>,
}

impl ConversationalChain {
    /// Create a chain with empty memory
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: VectorIndex,
        options: ChainOptions,
    ) -> Self {
        let memory = ConversationMemory::with_max_turns(options.memory.max_turns);
        Self {
            llm,
            embedder,
            index,
            options,
            memory: RwLock::new(memory),
        }
    }

    /// Answer a question
    ///
    /// A non-empty `chat_history` replaces the chain's own memory for this call.
    pub async fn invoke(&self, question: &str, chat_history: &[ChatTurn]) -> Result<ChainOutput> {
        let history = if !chat_history.is_empty() {
            chat_history.to_vec()
        } else if self.options.memory.enabled {
            self.memory.read().turns()
        } else {
            Vec::new()
        };

        let generated_question = if !history.is_empty() && self.options.rephrase_question {
            Some(self.condense(question, &history).await?)
        } else {
            None
        };
        let search_question = generated_question.as_deref().unwrap_or(question);

        let query_embedding = self.embedder.embed(search_question).await?;
        let source_chunks = self.index.search(&query_embedding, self.options.top_k)?;

        tracing::debug!(
            "Retrieved {} chunks for '{}'",
            source_chunks.len(),
            search_question
        );

        let chunks: Vec<_> = source_chunks.iter().map(|r| &r.chunk).collect();
        let context = PromptBuilder::build_context(&chunks);
        let prompt = PromptBuilder::build_qa_prompt(search_question, &context);
        let answer = self.llm.generate(&prompt).await?.trim().to_string();

        if self.options.memory.enabled {
            self.memory.write().push(question, answer.clone());
        }

        Ok(ChainOutput {
            answer,
            generated_question,
            source_chunks,
        })
    }

    async fn condense(&self, question: &str, history: &[ChatTurn]) -> Result<String> {
        let transcript = PromptBuilder::format_chat_history(history);
        let prompt = PromptBuilder::build_condense_prompt(&transcript, question);
        let standalone = self.llm.generate(&prompt).await?;
        let standalone = standalone.trim();

        if standalone.is_empty() {
            tracing::warn!("Model returned an empty standalone question, using the original");
            Ok(question.to_string())
        } else {
            Ok(standalone.to_string())
        }
    }

    /// Conversation so far, oldest first
    pub fn history(&self) -> Vec<ChatTurn> {
        self.memory.read().turns()
    }

    pub fn clear_history(&self) {
        self.memory.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::providers::testing::{StubEmbedder, StubLlm};
    use crate::types::{Chunk, ChunkSource};
    use uuid::Uuid;

    async fn build_chain(llm: Arc<StubLlm>, options: ChainOptions) -> ConversationalChain {
        let embedder = Arc::new(StubEmbedder::new());
        let texts = [
            "The warranty covers parts for two years.",
            "Shipping takes five business days.",
            "Returns are accepted within thirty days.",
        ];

        let mut chunks = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let source = ChunkSource::pdf("policy.pdf".to_string(), 1, 1);
            let mut chunk = Chunk::new(Uuid::nil(), text.to_string(), source, 0, text.len(), i as u32);
            chunk.embedding = embedder.embed(text).await.unwrap();
            chunks.push(chunk);
        }

        let index = VectorIndex::build(chunks, DistanceMetric::Euclidean).unwrap();
        ConversationalChain::new(llm, embedder, index, options)
    }

    #[tokio::test]
    async fn test_first_question_skips_rephrasing() {
        let llm = Arc::new(StubLlm::new("  Two years.  ", "unused"));
        let chain = build_chain(llm.clone(), ChainOptions::default()).await;

        let output = chain.invoke("How long is the warranty?", &[]).await.unwrap();

        assert_eq!(output.answer, "Two years.");
        assert!(output.generated_question.is_none());
        assert_eq!(output.source_chunks.len(), 2);
        assert!(output.source_chunks[0].chunk.content.contains("warranty"));

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("The warranty covers parts for two years."));
        assert!(prompts[0].ends_with("Question: How long is the warranty?\nHelpful Answer:"));

        assert_eq!(chain.history(), vec![ChatTurn::new("How long is the warranty?", "Two years.")]);
    }

    #[tokio::test]
    async fn test_follow_up_uses_memory_and_standalone_question() {
        let llm = Arc::new(StubLlm::new("Thirty days.", "How long do returns take?"));
        let chain = build_chain(llm.clone(), ChainOptions::default()).await;

        chain.invoke("What about shipping?", &[]).await.unwrap();
        let output = chain.invoke("And returns?", &[]).await.unwrap();

        assert_eq!(output.generated_question.as_deref(), Some("How long do returns take?"));
        assert!(output.source_chunks[0].chunk.content.contains("Returns"));

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains("\nHuman: What about shipping?\nAssistant: Thirty days.\nFollow Up Input: And returns?"));
        assert!(prompts[2].contains("Question: How long do returns take?"));

        // memory records the question as asked
        assert_eq!(chain.history()[1].question, "And returns?");
    }

    #[tokio::test]
    async fn test_explicit_history_overrides_memory() {
        let llm = Arc::new(StubLlm::new("ok", "standalone"));
        let chain = build_chain(llm.clone(), ChainOptions::default()).await;

        chain.invoke("first", &[]).await.unwrap();
        let explicit = vec![ChatTurn::new("other question", "other answer")];
        chain.invoke("next", &explicit).await.unwrap();

        let condense = &llm.prompts()[1];
        assert!(condense.contains("Human: other question"));
        assert!(!condense.contains("Human: first"));
    }

    #[tokio::test]
    async fn test_blank_standalone_falls_back_to_question() {
        let llm = Arc::new(StubLlm::new("answer", "   "));
        let chain = build_chain(llm.clone(), ChainOptions::default()).await;

        let history = vec![ChatTurn::new("q", "a")];
        let output = chain.invoke("Shipping time?", &history).await.unwrap();

        assert_eq!(output.generated_question.as_deref(), Some("Shipping time?"));
    }

    #[tokio::test]
    async fn test_memory_disabled_is_stateless() {
        let llm = Arc::new(StubLlm::new("answer", "standalone"));
        let options = ChainOptions {
            memory: MemoryConfig {
                enabled: false,
                max_turns: None,
            },
            ..ChainOptions::default()
        };
        let chain = build_chain(llm.clone(), options).await;

        chain.invoke("one", &[]).await.unwrap();
        let output = chain.invoke("two", &[]).await.unwrap();

        assert!(output.generated_question.is_none());
        assert!(chain.history().is_empty());
        assert_eq!(llm.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_rephrase_disabled_keeps_question() {
        let llm = Arc::new(StubLlm::new("answer", "standalone"));
        let options = ChainOptions {
            rephrase_question: false,
            ..ChainOptions::default()
        };
        let chain = build_chain(llm.clone(), options).await;

        chain.invoke("one", &[]).await.unwrap();
        let output = chain.invoke("two", &[]).await.unwrap();

        assert!(output.generated_question.is_none());
        assert_eq!(llm.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let llm = Arc::new(StubLlm::new("answer", "standalone"));
        let chain = build_chain(llm, ChainOptions::default()).await;

        chain.invoke("one", &[]).await.unwrap();
        chain.clear_history();
        assert!(chain.history().is_empty());
    }
}
