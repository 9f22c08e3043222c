//! Request-level flows: combine a stateless request with conversation memory
//! or template variables, call the gateway, unwrap the answer.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use ai_llm_service::{
    AiLlmError, CompletionResult, EmbeddingGateway, EmbeddingVector, ModelGateway, Turn,
    config::llm_model_config::DEFAULT_TIMEOUT_SECS,
    error_handler::{ConfigError, env_opt, env_opt_u64},
    prompt::PromptTemplate,
    services::retry::RetryPolicy,
};
use chat_memory::ConversationStore;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;

/// Conversation id used when a request does not name one.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

pub const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Turns kept per conversation.
    pub window: usize,
    /// Upper bound for one request to a gateway, retries included.
    pub call_timeout: Duration,
    /// Optional system message sent before any history.
    pub system_prompt: Option<String>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            call_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            system_prompt: None,
        }
    }
}

impl ContextOptions {
    /// Reads `CHAT_MEMORY_WINDOW`, `LLM_TIMEOUT_SECS` and `CHAT_SYSTEM_PROMPT`.
    ///
    /// The call timeout covers every attempt of the retry policy read by
    /// [`RetryPolicy::from_env`], so retries are not cut short.
    pub fn from_env() -> ai_llm_service::Result<Self> {
        let window = match env_opt_u64("CHAT_MEMORY_WINDOW")? {
            None => DEFAULT_WINDOW,
            Some(0) => {
                return Err(ConfigError::OutOfRange {
                    field: "CHAT_MEMORY_WINDOW",
                    detail: "expected at least 1 turn",
                }
                .into());
            }
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        };
        let call_timeout =
            call_timeout(env_opt_u64("LLM_TIMEOUT_SECS")?, &RetryPolicy::from_env()?)?;

        Ok(Self {
            window,
            call_timeout,
            system_prompt: env_opt("CHAT_SYSTEM_PROMPT"),
        })
    }
}

/// Deadline for a whole gateway call given the per-request timeout.
fn call_timeout(secs: Option<u64>, retry: &RetryPolicy) -> ai_llm_service::Result<Duration> {
    let per_attempt = match secs {
        None => DEFAULT_TIMEOUT_SECS,
        Some(0) => {
            return Err(ConfigError::OutOfRange {
                field: "LLM_TIMEOUT_SECS",
                detail: "expected at least 1 second",
            }
            .into());
        }
        Some(n) => n,
    };
    Ok(retry.budget(Duration::from_secs(per_attempt)))
}

/// Shared entry point for the HTTP layer. Construct once, wrap in `Arc`.
pub struct ChatContext {
    chat: Arc<dyn ModelGateway>,
    embedding: Arc<dyn EmbeddingGateway>,
    memory: Arc<ConversationStore>,
    recommend: PromptTemplate,
    opts: ContextOptions,
}

impl ChatContext {
    pub fn new(
        chat: Arc<dyn ModelGateway>,
        embedding: Arc<dyn EmbeddingGateway>,
        memory: Arc<ConversationStore>,
        opts: ContextOptions,
    ) -> Self {
        Self {
            chat,
            embedding,
            memory,
            recommend: PromptTemplate::recommend(),
            opts,
        }
    }

    pub fn options(&self) -> &ContextOptions {
        &self.opts
    }

    pub fn memory(&self) -> &ConversationStore {
        &self.memory
    }

    /// Plain completion, no memory.
    #[instrument(skip_all, fields(message_len = message.len()))]
    pub async fn ask(&self, message: &str) -> Result<CompletionResult> {
        let history = self.base_history();
        let out = self
            .with_timeout(self.chat.complete(message, &history))
            .await?;
        info!(model = %out.model, answer_len = out.text.len(), "completion done");
        Ok(out)
    }

    /// Completion that reads and extends the conversation `conversation_id`.
    ///
    /// The user/assistant pair is appended only after the backend answered,
    /// in one step, so a failed or cancelled call leaves memory untouched.
    #[instrument(skip_all, fields(conversation_id = %conversation_id))]
    pub async fn ask_in_conversation(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<CompletionResult> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AiLlmError::InvalidInput("prompt must not be empty").into());
        }

        let conversation = self
            .memory
            .get_or_create(conversation_id, self.opts.window)
            .await?;

        let mut history = self.base_history();
        history.extend(conversation.snapshot().await);
        debug!(history_len = history.len(), "history attached");

        let out = self
            .with_timeout(self.chat.complete(message, &history))
            .await?;

        conversation
            .append_all([Turn::user(message), Turn::assistant(out.text.clone())])
            .await;

        info!(model = %out.model, answer_len = out.text.len(), "conversation turn stored");
        Ok(out)
    }

    /// Renders the movie recommendation template.
    ///
    /// # Errors
    /// Blank values are rejected as invalid input.
    pub fn recommendation_prompt(&self, kind: &str, year: &str, lang: &str) -> Result<String> {
        let mut vars = HashMap::with_capacity(3);
        for (name, value) in [("type", kind), ("year", year), ("lang", lang)] {
            if value.trim().is_empty() {
                return Err(AiLlmError::InvalidInput(
                    "recommendation parameters must not be empty",
                )
                .into());
            }
            vars.insert(name.to_string(), value.trim().to_string());
        }
        Ok(self.recommend.render(&vars)?)
    }

    /// Renders the recommendation template and completes it, no memory.
    #[instrument(skip_all, fields(kind = %kind, year = %year, lang = %lang))]
    pub async fn recommend(&self, kind: &str, year: &str, lang: &str) -> Result<CompletionResult> {
        let prompt = self.recommendation_prompt(kind, year, lang)?;
        debug!(prompt_len = prompt.len(), "recommendation prompt assembled");
        self.ask(&prompt).await
    }

    /// Embeds `text` with the embedding profile.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let v = self.with_timeout(self.embedding.embed(text)).await?;
        debug!(dimensions = v.len(), "embedding done");
        Ok(v)
    }

    fn base_history(&self) -> Vec<Turn> {
        self.opts
            .system_prompt
            .as_deref()
            .map(Turn::system)
            .into_iter()
            .collect()
    }

    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = ai_llm_service::Result<T>>,
    ) -> ai_llm_service::Result<T> {
        match tokio::time::timeout(self.opts.call_timeout, fut).await {
            Ok(res) => res,
            Err(_) => {
                warn!(timeout_ms = self.opts.call_timeout.as_millis(), "backend call timed out");
                Err(AiLlmError::BackendTimeout(self.opts.call_timeout))
            }
        }
    }
}
