//! LLM configs loaded strictly from environment variables.
//!
//! Two roles are configured, each for the provider selected by `LLM_KIND`:
//!
//! - **Chat**      → chat-completion model
//! - **Embedding** → embedding generator
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`         = `ollama` (default) or `openai`
//! - `LLM_MAX_TOKENS`   = optional max tokens (u32)
//! - `LLM_TEMPERATURE`  = optional temperature (0.0..=2.0, default 0.7)
//! - `LLM_TIMEOUT_SECS` = per-call timeout (default 60)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = chat model (mandatory)
//! - `OLLAMA_API`                  = `chat` (default) or `generate`
//! - `EMBEDDING_MODEL`             = embedding model (mandatory)
//!
//! OpenAI:
//! - `OPENAI_API_KEY`  = bearer key (mandatory)
//! - `OPENAI_BASE_URL` = base URL (default `https://api.openai.com`)
//! - `OPENAI_MODEL`    = chat model (default `gpt-4o-mini`)
//! - `EMBEDDING_MODEL` = embedding model (default `text-embedding-3-small`)

use crate::{
    config::{
        llm_model_config::{DEFAULT_TIMEOUT_SECS, LlmModelConfig},
        llm_provider::{LlmProvider, OllamaApi},
    },
    error_handler::{
        AiLlmError, ConfigError, env_opt, env_opt_f32, env_opt_u32, env_opt_u64, must_env,
        validate_http_endpoint, validate_range_f32,
    },
};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const OPENAI_DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Reads `LLM_KIND`, defaulting to Ollama.
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    match env_opt("LLM_KIND") {
        Some(kind) => Ok(kind.parse::<LlmProvider>()?),
        None => Ok(LlmProvider::Ollama),
    }
}

/// Resolves the Ollama endpoint.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}

fn openai_endpoint() -> Result<String, AiLlmError> {
    let url = env_opt("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_DEFAULT_BASE_URL.to_string());
    validate_http_endpoint("OPENAI_BASE_URL", &url)?;
    Ok(url)
}

fn temperature() -> Result<f32, AiLlmError> {
    let t = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE);
    validate_range_f32("LLM_TEMPERATURE", t, 0.0, 2.0)?;
    Ok(t)
}

fn timeout_secs() -> Result<u64, AiLlmError> {
    let secs = env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if secs == 0 {
        return Err(ConfigError::OutOfRange {
            field: "LLM_TIMEOUT_SECS",
            detail: "expected at least 1 second",
        }
        .into());
    }
    Ok(secs)
}

/// Constructs the chat-completion config for the provider in `LLM_KIND`.
pub fn config_chat_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;
    let temperature = Some(temperature()?);
    let timeout_secs = Some(timeout_secs()?);

    match provider_from_env()? {
        LlmProvider::Ollama => Ok(LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: must_env("OLLAMA_MODEL")?,
            endpoint: ollama_endpoint()?,
            api_key: None,
            max_tokens,
            temperature,
            top_p: None,
            timeout_secs,
            ollama_api: match env_opt("OLLAMA_API") {
                Some(v) => v.parse::<OllamaApi>()?,
                None => OllamaApi::default(),
            },
        }),
        LlmProvider::OpenAI => Ok(LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: env_opt("OPENAI_MODEL").unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            endpoint: openai_endpoint()?,
            api_key: Some(must_env("OPENAI_API_KEY")?),
            max_tokens,
            temperature,
            top_p: None,
            timeout_secs,
            ollama_api: OllamaApi::default(),
        }),
    }
}

/// Constructs the embedding config for the provider in `LLM_KIND`.
///
/// Embeddings are deterministic: `temperature` is not sent.
pub fn config_embedding_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let timeout_secs = Some(timeout_secs()?);

    match provider_from_env()? {
        LlmProvider::Ollama => Ok(LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: must_env("EMBEDDING_MODEL")?,
            endpoint: ollama_endpoint()?,
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs,
            ollama_api: OllamaApi::default(),
        }),
        LlmProvider::OpenAI => Ok(LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: env_opt("EMBEDDING_MODEL")
                .unwrap_or_else(|| OPENAI_DEFAULT_EMBEDDING_MODEL.to_string()),
            endpoint: openai_endpoint()?,
            api_key: Some(must_env("OPENAI_API_KEY")?),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs,
            ollama_api: OllamaApi::default(),
        }),
    }
}
