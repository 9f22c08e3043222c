use crate::config::llm_provider::{LlmProvider, OllamaApi};

/// Configuration for one model on one backend.
///
/// Built once at startup (see [`crate::config::default_config`]) and handed
/// to the provider clients by value. Never mutated afterwards.
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::OpenAI,
///     model: "gpt-4o-mini".to_string(),
///     endpoint: "https://api.openai.com".to_string(),
///     api_key: Some("sk-...".to_string()),
///     max_tokens: Some(1024),
///     temperature: Some(0.7),
///     top_p: None,
///     timeout_secs: Some(60),
///     ollama_api: Default::default(),
/// };
/// assert_eq!(cfg.timeout().as_secs(), 60);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The backend (Ollama, OpenAI).
    pub provider: LlmProvider,

    /// Model identifier (e.g. `"gpt-4o-mini"`, `"llama3.2"`).
    pub model: String,

    /// Base URL of the backend, without the API path.
    pub endpoint: String,

    /// Bearer key for providers that require authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Ollama only: chat vs. generate endpoint.
    pub ollama_api: OllamaApi,
}

/// Timeout used when a config does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

impl LlmModelConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Endpoint with surrounding whitespace and trailing slashes removed.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }
}
