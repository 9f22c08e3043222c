use std::collections::VecDeque;

use ai_llm_service::Turn;

use crate::errors::MemoryError;

/// Bounded FIFO log of turns for one conversation id.
///
/// `len() <= capacity()` holds after every call. Not synchronized by itself;
/// the store wraps each conversation in its own mutex.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: String,
    capacity: usize,
    turns: VecDeque<Turn>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, capacity: usize) -> Result<Self, MemoryError> {
        if capacity == 0 {
            return Err(MemoryError::InvalidCapacity(capacity));
        }
        Ok(Self {
            id: id.into(),
            capacity,
            turns: VecDeque::with_capacity(capacity),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Pushes `turn` to the back, evicting from the front while over capacity.
    /// Returns the number of evicted turns.
    pub fn append(&mut self, turn: Turn) -> usize {
        self.turns.push_back(turn);
        let mut evicted = 0;
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Owned copy of the turns, oldest first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }
}
