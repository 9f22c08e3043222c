//! OpenAI (and OpenAI-compatible) client for chat completion and embeddings.
//!
//! Minimal, non-streaming client around the OpenAI REST API. Endpoints are
//! derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1/chat/completions: chat completion
//! - POST {endpoint}/v1/embeddings      : embeddings retrieval
//!
//! Constructor validation:
//! - `cfg.provider` must be `LlmProvider::OpenAI`
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{
    chat::{CompletionResult, EmbeddingVector, Turn},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError, HttpError, Result, make_snippet},
    gateway::{EmbeddingGateway, ModelGateway},
};

const PROVIDER: LlmProvider = LlmProvider::OpenAI;

/// Thin client for the OpenAI API.
///
/// Keeps a preconfigured `reqwest::Client` (timeout and bearer header).
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not OpenAI
    /// - [`ConfigError::MissingVar`] if `cfg.api_key` is `None`
    /// - [`ConfigError::InvalidFormat`] if the endpoint or key is malformed
    /// - [`AiLlmError::BackendUnavailable`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != PROVIDER {
            return Err(ConfigError::UnsupportedProvider(format!("{:?}", cfg.provider)).into());
        }

        let api_key = cfg
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;

        let base = cfg.base_url().to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidFormat {
                var: "OPENAI_BASE_URL",
                reason: "must start with http:// or https://",
            }
            .into());
        }

        let mut auth = header::HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
            ConfigError::InvalidFormat {
                var: "OPENAI_API_KEY",
                reason: "not a valid header value",
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| AiLlmError::unavailable(PROVIDER, e))?;

        info!(
            model = %cfg.model,
            endpoint = %base,
            timeout_secs = cfg.timeout().as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            url_chat: format!("{base}/v1/chat/completions"),
            url_embeddings: format!("{base}/v1/embeddings"),
            cfg,
        })
    }

    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let started = Instant::now();
        debug!(model = %self.cfg.model, "POST {}", url);

        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AiLlmError::from_transport(PROVIDER, e, self.cfg.timeout()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let http = HttpError {
                status,
                url: url.to_string(),
                snippet: make_snippet(&text),
            };
            error!(
                %status,
                url = %http.url,
                snippet = %http.snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "OpenAI returned non-success status"
            );
            return Err(AiLlmError::unavailable(PROVIDER, http));
        }

        let out = resp.json::<R>().await.map_err(|e| {
            if e.is_timeout() {
                AiLlmError::BackendTimeout(self.cfg.timeout())
            } else {
                AiLlmError::unavailable(PROVIDER, format!("failed to decode {url}: {e}"))
            }
        })?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            "OpenAI call completed"
        );
        Ok(out)
    }
}

#[async_trait]
impl ModelGateway for OpenAiService {
    fn model(&self) -> &str {
        &self.cfg.model
    }

    #[instrument(skip_all, fields(model = %self.cfg.model, turns = messages.len()))]
    async fn chat(&self, messages: &[Turn]) -> Result<CompletionResult> {
        let body = ChatCompletionRequest::from_cfg(&self.cfg, messages);
        let out: ChatCompletionResponse = self.post_json(&self.url_chat, &body).await?;

        let text = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AiLlmError::EmptyResponse { provider: PROVIDER })?;

        Ok(CompletionResult {
            text,
            model: out.model.unwrap_or_else(|| self.cfg.model.clone()),
        })
    }
}

#[async_trait]
impl EmbeddingGateway for OpenAiService {
    fn model(&self) -> &str {
        &self.cfg.model
    }

    #[instrument(skip_all, fields(model = %self.cfg.model, input_len = input.len()))]
    async fn embeddings(&self, input: &str) -> Result<EmbeddingVector> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input,
        };
        let out: EmbeddingsResponse = self.post_json(&self.url_embeddings, &body).await?;

        out.data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .filter(|v| !v.is_empty())
            .ok_or(AiLlmError::EmptyResponse { provider: PROVIDER })
    }
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Request body for `/v1/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, messages: &'a [Turn]) -> Self {
        Self {
            model: &cfg.model,
            messages: messages
                .iter()
                .map(|t| ChatMessage {
                    role: t.role().as_str(),
                    content: t.text(),
                })
                .collect(),
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}
