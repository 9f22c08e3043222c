//! GET /api/{message}: plain chat completion.

use std::sync::Arc;

use axum::{
    extract::{Path, State, rejection::PathRejection},
    http::HeaderMap,
};
use chat_context::DEFAULT_CONVERSATION_ID;
use tracing::debug;

use crate::{app::app_state::AppState, error_handler::AppResult};

pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

fn conversation_id(headers: &HeaderMap) -> &str {
    headers
        .get(CONVERSATION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONVERSATION_ID)
}

/// Handler: GET /api/{message}
///
/// Answers as `text/plain`. With memory enabled the exchange is stored under
/// the `X-Conversation-Id` header (or `"default"`).
///
/// # Example
/// ```bash
/// curl http://127.0.0.1:8080/api/Tell%20me%20a%20joke \
///   -H 'X-Conversation-Id: alice'
/// ```
pub async fn ask(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    message: Result<Path<String>, PathRejection>,
) -> AppResult<String> {
    let Path(message) = message?;

    let answer = if state.memory_enabled {
        let id = conversation_id(&headers);
        debug!(conversation_id = %id, "answering with memory");
        state.context.ask_in_conversation(id, &message).await?
    } else {
        state.context.ask(&message).await?
    };

    Ok(answer.text)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn conversation_id_falls_back_to_default() {
        let mut headers = HeaderMap::new();
        assert_eq!(conversation_id(&headers), "default");

        headers.insert(CONVERSATION_ID_HEADER, HeaderValue::from_static(" "));
        assert_eq!(conversation_id(&headers), "default");

        headers.insert(CONVERSATION_ID_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(conversation_id(&headers), "alice");
    }
}
