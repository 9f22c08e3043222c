use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Backend used for chat completion and embeddings.
///
/// ```
/// use ai_llm_service::LlmProvider;
///
/// let provider: LlmProvider = "openai".parse().unwrap();
/// assert_eq!(provider, LlmProvider::OpenAI);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI or any server speaking the OpenAI REST dialect.
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Which Ollama endpoint carries chat requests.
///
/// `Chat` sends structured messages to `/api/chat`. `Generate` flattens the
/// history into a single prompt for `/api/generate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OllamaApi {
    #[default]
    Chat,
    Generate,
}

impl FromStr for OllamaApi {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(OllamaApi::Chat),
            "generate" => Ok(OllamaApi::Generate),
            _ => Err(ConfigError::InvalidFormat {
                var: "OLLAMA_API",
                reason: "expected `chat` or `generate`",
            }),
        }
    }
}
