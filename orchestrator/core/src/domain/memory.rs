// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conversation memory
//!
//! Bounded buffer of recent request/selection exchanges handed to the
//! classifier as context.
//!
//! Not synchronized: callers that share one buffer across concurrent
//! requests must serialize access (see `application::pipeline::SessionMemories`).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Five request/response pairs.
pub const DEFAULT_MEMORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest ones once capacity is exceeded.
    pub fn push(&mut self, role: impl Into<String>, content: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        self.turns.push_back(ConversationTurn {
            role: role.into(),
            content: content.into(),
        });
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    pub fn record_exchange(&mut self, request: &str, response: &str) {
        self.push("user", request);
        self.push("assistant", response);
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// One `role: content` line per turn, oldest first.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role, t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_plus_one_evicts_oldest() {
        let mut memory = ConversationMemory::default();
        for i in 0..=DEFAULT_MEMORY_CAPACITY {
            memory.push("user", format!("m{i}"));
        }
        assert_eq!(memory.len(), DEFAULT_MEMORY_CAPACITY);
        assert_eq!(memory.turns().next().unwrap().content, "m1");
    }

    #[test]
    fn test_capacity_plus_five_keeps_newest() {
        let mut memory = ConversationMemory::default();
        for i in 0..DEFAULT_MEMORY_CAPACITY + 5 {
            memory.push("user", format!("m{i}"));
            assert!(memory.len() <= memory.capacity());
        }
        let contents: Vec<_> = memory.turns().map(|t| t.content.clone()).collect();
        assert_eq!(contents.first().unwrap(), "m5");
        assert_eq!(contents.last().unwrap(), "m14");
    }

    #[test]
    fn test_record_exchange_and_render() {
        let mut memory = ConversationMemory::new(4);
        memory.record_exchange("what is my spend", "[\"cost\"]");
        assert_eq!(memory.render(), "user: what is my spend\nassistant: [\"cost\"]");
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut memory = ConversationMemory::new(0);
        memory.record_exchange("a", "b");
        assert!(memory.is_empty());
    }
}
