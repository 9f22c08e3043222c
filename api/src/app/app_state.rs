use std::{num::NonZeroUsize, sync::Arc};

use ai_llm_service::{
    AiLlmError,
    error_handler::{ConfigError, env_opt, env_opt_bool, env_opt_u64},
    service_profiles::LlmServiceProfiles,
};
use chat_context::{ChatContext, ContextOptions};
use chat_memory::ConversationStore;
use tracing::info;

pub const DEFAULT_API_ADDRESS: &str = "0.0.0.0:8080";

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// `host:port`, e.g. "0.0.0.0:8080"
    pub address: String,
}

impl ApiSettings {
    /// Reads `API_ADDRESS`, falling back to [`DEFAULT_API_ADDRESS`].
    pub fn from_env() -> Self {
        Self {
            address: env_opt("API_ADDRESS").unwrap_or_else(|| DEFAULT_API_ADDRESS.into()),
        }
    }
}

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Request flows (memory, templates, timeouts).
    pub context: ChatContext,
    /// Backend configs for `/health`; `None` when gateways were injected
    /// directly.
    pub profiles: Option<LlmServiceProfiles>,
    /// Whether `GET /api/{message}` reads and writes conversation memory.
    pub memory_enabled: bool,
}

impl AppState {
    pub fn new(
        context: ChatContext,
        profiles: Option<LlmServiceProfiles>,
        memory_enabled: bool,
    ) -> Self {
        Self {
            context,
            profiles,
            memory_enabled,
        }
    }

    /// Builds gateways, memory and context from environment variables.
    ///
    /// # Errors
    /// Any [`AiLlmError::Config`] from the variables involved; startup should
    /// abort on it.
    pub fn from_env() -> Result<Arc<Self>, AiLlmError> {
        let profiles = LlmServiceProfiles::from_env()?;
        let opts = ContextOptions::from_env()?;
        let memory_enabled = env_opt_bool("CHAT_MEMORY_ENABLED")?.unwrap_or(true);
        let max_conversations = max_conversations(env_opt_u64("CHAT_MEMORY_MAX_CONVERSATIONS")?)?;

        info!(
            memory_enabled,
            window = opts.window,
            max_conversations = ?max_conversations,
            timeout_secs = opts.call_timeout.as_secs(),
            "chat context configured"
        );

        let memory = Arc::new(ConversationStore::with_max_conversations(max_conversations));
        let context = ChatContext::new(profiles.chat(), profiles.embedding(), memory, opts);

        Ok(Arc::new(Self::new(context, Some(profiles), memory_enabled)))
    }
}

/// Unset means unbounded; an explicit `0` is a config error.
fn max_conversations(raw: Option<u64>) -> Result<Option<NonZeroUsize>, AiLlmError> {
    match raw {
        None => Ok(None),
        Some(n) => NonZeroUsize::new(usize::try_from(n).unwrap_or(usize::MAX))
            .map(Some)
            .ok_or_else(|| {
                ConfigError::OutOfRange {
                    field: "CHAT_MEMORY_MAX_CONVERSATIONS",
                    detail: "expected at least 1 conversation",
                }
                .into()
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_conversation_cap_is_rejected() {
        assert!(matches!(
            max_conversations(Some(0)),
            Err(AiLlmError::Config(ConfigError::OutOfRange {
                field: "CHAT_MEMORY_MAX_CONVERSATIONS",
                ..
            }))
        ));
        assert_eq!(max_conversations(None).unwrap(), None);
        assert_eq!(max_conversations(Some(3)).unwrap(), NonZeroUsize::new(3));
    }
}
