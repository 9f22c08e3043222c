use ai_llm_service::{AiLlmError, prompt::PromptError};
use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chat_context::ChatContextError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error(transparent)]
    Config(AiLlmError),

    // --- IO / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Anything raised while serving a request.
    #[error(transparent)]
    Chat(#[from] ChatContextError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Chat(e) => chat_status(e),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Chat(e) => chat_code(e),
        }
    }
}

fn chat_status(err: &ChatContextError) -> StatusCode {
    match err {
        ChatContextError::Llm(e) => match e {
            AiLlmError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AiLlmError::BackendUnavailable { .. } | AiLlmError::EmptyResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AiLlmError::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        ChatContextError::Prompt(PromptError::MissingVariable(_)) => StatusCode::BAD_REQUEST,
        ChatContextError::Memory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn chat_code(err: &ChatContextError) -> &'static str {
    match err {
        ChatContextError::Llm(e) => match e {
            AiLlmError::InvalidInput(_) => "INVALID_INPUT",
            AiLlmError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            AiLlmError::EmptyResponse { .. } => "EMPTY_RESPONSE",
            AiLlmError::BackendTimeout(_) => "BACKEND_TIMEOUT",
            AiLlmError::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        },
        ChatContextError::Prompt(PromptError::MissingVariable(_)) => "MISSING_VARIABLE",
        ChatContextError::Memory(_) => "MEMORY_ERROR",
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}
