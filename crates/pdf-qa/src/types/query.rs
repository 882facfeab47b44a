//! Request types

use serde::{Deserialize, Serialize};

/// One question/answer exchange in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// What the user asked
    pub question: String,
    /// What the assistant answered
    pub answer: String,
}

impl ChatTurn {
    /// Create a new turn
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Question submitted to the chatbot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Explicit conversation history; when empty the session memory is used
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}
