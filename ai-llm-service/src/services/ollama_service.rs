//! Thin client for the local Ollama API.
//!
//! - `POST {endpoint}/api/chat`    : chat completion (`stream=false`)
//! - `POST {endpoint}/api/generate`: single-prompt completion, used when the
//!   config selects [`OllamaApi::Generate`]; history is flattened with
//!   [`crate::prompt::assemble_with_history`]'s format
//! - `POST {endpoint}/api/embed`   : embeddings
//!
//! # Examples
//!
//! ```no_run
//! use ai_llm_service::{LlmModelConfig, LlmProvider, ModelGateway, Turn};
//! use ai_llm_service::services::ollama_service::OllamaService;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "llama3.2".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     max_tokens: Some(256),
//!     temperature: Some(0.7),
//!     top_p: None,
//!     timeout_secs: Some(30),
//!     ollama_api: Default::default(),
//! };
//!
//! let svc = OllamaService::new(cfg)?;
//! let out = svc.complete("Write a haiku about Rust.", &[Turn::system("Be brief.")]).await?;
//! println!("{}: {}", out.model, out.text);
//! # Ok(()) }
//! ```

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{
    chat::{CompletionResult, EmbeddingVector, Turn},
    config::{
        llm_model_config::LlmModelConfig,
        llm_provider::{LlmProvider, OllamaApi},
    },
    error_handler::{AiLlmError, ConfigError, HttpError, Result, make_snippet},
    gateway::{EmbeddingGateway, ModelGateway},
    prompt::render_transcript,
};

const PROVIDER: LlmProvider = LlmProvider::Ollama;

/// Thin client for Ollama.
///
/// Holds one `reqwest::Client` with the configured timeout; cheap to share
/// behind an `Arc`.
#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    url_generate: String,
    url_embed: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not Ollama
    /// - [`ConfigError::InvalidFormat`] if `cfg.endpoint` is not http(s)
    /// - [`AiLlmError::BackendUnavailable`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != PROVIDER {
            return Err(ConfigError::UnsupportedProvider(format!("{:?}", cfg.provider)).into());
        }

        let base = cfg.base_url().to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidFormat {
                var: "OLLAMA_URL",
                reason: "must start with http:// or https://",
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| AiLlmError::unavailable(PROVIDER, e))?;

        info!(
            model = %cfg.model,
            endpoint = %base,
            api = ?cfg.ollama_api,
            timeout_secs = cfg.timeout().as_secs(),
            "OllamaService initialized"
        );

        Ok(Self {
            client,
            url_chat: format!("{base}/api/chat"),
            url_generate: format!("{base}/api/generate"),
            url_embed: format!("{base}/api/embed"),
            cfg,
        })
    }

    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: self.cfg.temperature,
            top_p: self.cfg.top_p,
            num_predict: self.cfg.max_tokens,
        }
    }

    /// POSTs `body` to `url` and decodes a 2xx JSON answer.
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
                "Ollama returned non-success status"
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

        debug!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            "Ollama call completed"
        );
        Ok(out)
    }

    async fn chat_endpoint(&self, messages: &[Turn]) -> Result<CompletionResult> {
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: messages
                .iter()
                .map(|t| ChatMessage {
                    role: t.role().as_str(),
                    content: t.text(),
                })
                .collect(),
            stream: false,
            options: self.options(),
        };

        let out: ChatResponse = self.post_json(&self.url_chat, &body).await?;
        let text = out
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AiLlmError::EmptyResponse { provider: PROVIDER })?;

        Ok(CompletionResult {
            text,
            model: out.model.unwrap_or_else(|| self.cfg.model.clone()),
        })
    }

    async fn generate_endpoint(&self, messages: &[Turn]) -> Result<CompletionResult> {
        let prompt = render_transcript(messages);
        let body = GenerateRequest {
            model: &self.cfg.model,
            prompt: &prompt,
            stream: false,
            options: self.options(),
        };

        let out: GenerateResponse = self.post_json(&self.url_generate, &body).await?;
        let text = out
            .response
            .filter(|r| !r.trim().is_empty())
            .ok_or(AiLlmError::EmptyResponse { provider: PROVIDER })?;

        Ok(CompletionResult {
            text,
            model: out.model.unwrap_or_else(|| self.cfg.model.clone()),
        })
    }
}

#[async_trait]
impl ModelGateway for OllamaService {
    fn model(&self) -> &str {
        &self.cfg.model
    }

    #[instrument(skip_all, fields(model = %self.cfg.model, turns = messages.len()))]
    async fn chat(&self, messages: &[Turn]) -> Result<CompletionResult> {
        match self.cfg.ollama_api {
            OllamaApi::Chat => self.chat_endpoint(messages).await,
            OllamaApi::Generate => self.generate_endpoint(messages).await,
        }
    }
}

#[async_trait]
impl EmbeddingGateway for OllamaService {
    fn model(&self) -> &str {
        &self.cfg.model
    }

    #[instrument(skip_all, fields(model = %self.cfg.model, input_len = input.len()))]
    async fn embeddings(&self, input: &str) -> Result<EmbeddingVector> {
        let body = EmbedRequest {
            model: &self.cfg.model,
            input,
        };

        let out: EmbedResponse = self.post_json(&self.url_embed, &body).await?;
        out.embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(AiLlmError::EmptyResponse { provider: PROVIDER })
    }
}

/* ==========================
HTTP payloads & options
========================== */

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Request body for `/api/chat` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    #[serde(default)]
    content: String,
}

/// Response body for `/api/chat`; the answer is in `message.content`.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    message: Option<ChatMessageOut>,
}

/// Request body for `/api/generate` (non-streaming).
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

/// Response body for `/api/generate`; the answer is in `response`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: Option<String>,
    response: Option<String>,
}

/// Request body for `/api/embed`.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response body for `/api/embed`.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}
