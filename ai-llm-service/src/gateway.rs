//! Backend-agnostic contracts for chat completion and embeddings.
//!
//! Provider clients implement the low-level `chat`/`embeddings` calls. The
//! provided `complete`/`embed` methods validate input first, so a blank
//! prompt never reaches the network, and build the outbound message list in
//! one place for every backend.

use async_trait::async_trait;

use crate::{
    chat::{CompletionResult, EmbeddingVector, Turn},
    error_handler::{AiLlmError, Result},
};

/// "Send a prompt with history, receive a single textual completion."
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Configured model identifier.
    fn model(&self) -> &str;

    /// Sends an already assembled message list and unwraps the first result.
    ///
    /// Implementations return [`AiLlmError::EmptyResponse`] when the backend
    /// yields no result and never retry internally.
    async fn chat(&self, messages: &[Turn]) -> Result<CompletionResult>;

    /// Completes `prompt` after `history` (oldest first).
    ///
    /// # Errors
    /// - [`AiLlmError::InvalidInput`] if `prompt` is blank; no backend call is made
    /// - whatever [`ModelGateway::chat`] returns
    async fn complete(&self, prompt: &str, history: &[Turn]) -> Result<CompletionResult> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AiLlmError::InvalidInput("prompt must not be empty"));
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(Turn::user(prompt));

        self.chat(&messages).await
    }
}

/// "Send text, receive a fixed-length numeric vector."
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Configured embedding model identifier.
    fn model(&self) -> &str;

    /// Raw embeddings call.
    async fn embeddings(&self, input: &str) -> Result<EmbeddingVector>;

    /// Embeds `text`.
    ///
    /// # Errors
    /// - [`AiLlmError::InvalidInput`] if `text` is blank; no backend call is made
    /// - whatever [`EmbeddingGateway::embeddings`] returns
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        if text.trim().is_empty() {
            return Err(AiLlmError::InvalidInput("text must not be empty"));
        }
        self.embeddings(text).await
    }
}
