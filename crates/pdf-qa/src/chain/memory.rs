//! Conversation buffer memory

use std::collections::VecDeque;

use crate::types::ChatTurn;

/// Ordered record of past exchanges, optionally windowed
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: VecDeque<ChatTurn>,
    max_turns: Option<usize>,
}

impl ConversationMemory {
    /// Unbounded memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory that keeps only the most recent `max_turns` exchanges
    pub fn with_max_turns(max_turns: Option<usize>) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// Past turns, oldest first
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.turns.iter().cloned().collect()
    }

    /// Record an exchange
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push_back(ChatTurn::new(question, answer));
        if let Some(max) = self.max_turns {
            while self.turns.len() > max {
                self.turns.pop_front();
            }
        }
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
