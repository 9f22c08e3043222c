//! Typed error for the chat-context crate.

use ai_llm_service::{AiLlmError, prompt::PromptError};
use chat_memory::MemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatContextError {
    /// Gateway failures, passed through unchanged.
    #[error(transparent)]
    Llm(#[from] AiLlmError),

    /// Template rendering failures.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Conversation memory failures.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

pub type Result<T> = std::result::Result<T, ChatContextError>;
