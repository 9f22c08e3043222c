//! Process-wide LLM service with two profiles: `chat` and `embedding`.
//!
//! - Built once at startup from [`LlmModelConfig`]s, then immutable.
//! - Wrap in `Arc` and pass clones to dependents; there is no global instance.
//! - Each profile is a provider client behind the gateway traits, optionally
//!   decorated with [`RetryingGateway`].
//!
//! # Example
//! ```no_run
//! use ai_llm_service::ModelGateway;
//! use ai_llm_service::service_profiles::LlmServiceProfiles;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = LlmServiceProfiles::from_env()?;
//! let answer = svc.chat().complete("Hello", &[]).await?;
//! println!("{}", answer.text);
//! println!("{:?}", svc.health_all().await);
//! # Ok(()) }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::{
    config::{
        default_config::{config_chat_from_env, config_embedding_from_env},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::AiLlmError,
    gateway::{EmbeddingGateway, ModelGateway},
    health_service::{HealthService, HealthStatus},
    services::{
        ollama_service::OllamaService,
        open_ai_service::OpenAiService,
        retry::{RetryPolicy, RetryingGateway},
    },
};

pub struct LlmServiceProfiles {
    chat_cfg: LlmModelConfig,
    embedding_cfg: LlmModelConfig,

    chat: Arc<dyn ModelGateway>,
    embedding: Arc<dyn EmbeddingGateway>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Builds both profiles and the health checker.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if a provider client cannot be constructed.
    pub fn new(
        chat_cfg: LlmModelConfig,
        embedding_cfg: LlmModelConfig,
        retry: RetryPolicy,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let chat = build_model_gateway(&chat_cfg, retry)?;
        let embedding = build_embedding_gateway(&embedding_cfg, retry)?;

        info!(
            chat_provider = ?chat_cfg.provider,
            chat_model = %chat_cfg.model,
            embedding_model = %embedding_cfg.model,
            max_retries = retry.max_retries,
            "LLM profiles ready"
        );

        Ok(Self {
            chat_cfg,
            embedding_cfg,
            chat,
            embedding,
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Loads both profiles and the retry policy from the environment.
    pub fn from_env() -> Result<Self, AiLlmError> {
        Self::new(
            config_chat_from_env()?,
            config_embedding_from_env()?,
            RetryPolicy::from_env()?,
            Some(10),
        )
    }

    pub fn chat(&self) -> Arc<dyn ModelGateway> {
        Arc::clone(&self.chat)
    }

    pub fn embedding(&self) -> Arc<dyn EmbeddingGateway> {
        Arc::clone(&self.embedding)
    }

    /// Returns `(chat, embedding)` configs.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.chat_cfg, &self.embedding_cfg)
    }

    /// Health snapshot for every distinct profile.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = vec![self.chat_cfg.clone()];
        if self.embedding_cfg != self.chat_cfg {
            list.push(self.embedding_cfg.clone());
        }
        self.health.check_many(&list).await
    }
}

/// Bounds every retried attempt by the profile's request timeout.
fn per_attempt(cfg: &LlmModelConfig, retry: RetryPolicy) -> RetryPolicy {
    RetryPolicy {
        attempt_timeout: Some(cfg.timeout()),
        ..retry
    }
}

/// Builds the chat client for `cfg.provider`.
pub fn build_model_gateway(
    cfg: &LlmModelConfig,
    retry: RetryPolicy,
) -> Result<Arc<dyn ModelGateway>, AiLlmError> {
    let gateway: Arc<dyn ModelGateway> = match (cfg.provider, retry.is_enabled()) {
        (LlmProvider::Ollama, false) => Arc::new(OllamaService::new(cfg.clone())?),
        (LlmProvider::Ollama, true) => Arc::new(RetryingGateway::new(
            OllamaService::new(cfg.clone())?,
            per_attempt(cfg, retry),
        )),
        (LlmProvider::OpenAI, false) => Arc::new(OpenAiService::new(cfg.clone())?),
        (LlmProvider::OpenAI, true) => Arc::new(RetryingGateway::new(
            OpenAiService::new(cfg.clone())?,
            per_attempt(cfg, retry),
        )),
    };
    Ok(gateway)
}

/// Builds the embedding client for `cfg.provider`.
pub fn build_embedding_gateway(
    cfg: &LlmModelConfig,
    retry: RetryPolicy,
) -> Result<Arc<dyn EmbeddingGateway>, AiLlmError> {
    let gateway: Arc<dyn EmbeddingGateway> = match (cfg.provider, retry.is_enabled()) {
        (LlmProvider::Ollama, false) => Arc::new(OllamaService::new(cfg.clone())?),
        (LlmProvider::Ollama, true) => Arc::new(RetryingGateway::new(
            OllamaService::new(cfg.clone())?,
            per_attempt(cfg, retry),
        )),
        (LlmProvider::OpenAI, false) => Arc::new(OpenAiService::new(cfg.clone())?),
        (LlmProvider::OpenAI, true) => Arc::new(RetryingGateway::new(
            OpenAiService::new(cfg.clone())?,
            per_attempt(cfg, retry),
        )),
    };
    Ok(gateway)
}
