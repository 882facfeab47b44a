//! Prompt templates for conversational retrieval

use crate::types::{Chunk, ChatTurn};

/// Prompt builder for the retrieval chain
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk contents into one context block
    pub fn build_context(chunks: &[&Chunk]) -> String {
        chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the question-answering prompt over the stuffed context
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:"#,
            context = context,
            question = question
        )
    }

    /// Render conversation turns as a transcript
    pub fn format_chat_history(turns: &[ChatTurn]) -> String {
        turns
            .iter()
            .map(|turn| format!("\nHuman: {}\nAssistant: {}", turn.question, turn.answer))
            .collect()
    }

    /// Build the prompt that rewrites a follow-up into a standalone question
    pub fn build_condense_prompt(chat_history: &str, question: &str) -> String {
        format!(
            r#"Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:"#,
            chat_history = chat_history,
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkSource;
    use uuid::Uuid;

    #[test]
    fn test_context_joins_chunks() {
        let source = ChunkSource::pdf("a.pdf".to_string(), 1, 1);
        let first = Chunk::new(Uuid::new_v4(), "First.".to_string(), source.clone(), 0, 6, 0);
        let second = Chunk::new(Uuid::new_v4(), "Second.".to_string(), source, 7, 14, 1);

        assert_eq!(PromptBuilder::build_context(&[&first, &second]), "First.\n\nSecond.");
    }

    #[test]
    fn test_qa_prompt_layout() {
        let prompt = PromptBuilder::build_qa_prompt("Who wrote it?", "Ada wrote it.");
        assert!(prompt.starts_with("Use the following pieces of context"));
        assert!(prompt.contains("\n\nAda wrote it.\n\nQuestion: Who wrote it?\nHelpful Answer:"));
    }

    #[test]
    fn test_chat_history_transcript() {
        let turns = vec![ChatTurn::new("Hi?", "Hello."), ChatTurn::new("Name?", "Bot.")];
        assert_eq!(
            PromptBuilder::format_chat_history(&turns),
            "\nHuman: Hi?\nAssistant: Hello.\nHuman: Name?\nAssistant: Bot."
        );
        assert_eq!(PromptBuilder::format_chat_history(&[]), "");
    }

    #[test]
    fn test_condense_prompt_contains_history_and_question() {
        let prompt = PromptBuilder::build_condense_prompt("\nHuman: a\nAssistant: b", "and c?");
        assert!(prompt.contains("Chat History:\n\nHuman: a\nAssistant: b\nFollow Up Input: and c?"));
        assert!(prompt.ends_with("Standalone question:"));
    }
}
