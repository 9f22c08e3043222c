//! Chat and embedding gateways over hosted (OpenAI-compatible) and local
//! (Ollama) model backends.
//!
//! The crate exposes two narrow contracts, [`gateway::ModelGateway`] and
//! [`gateway::EmbeddingGateway`], provider clients implementing them, the
//! prompt assembler used to build outbound prompts, and the ambient pieces
//! shared by the rest of the workspace (env config, errors, health, telemetry).

pub mod chat;
pub mod config;
pub mod error_handler;
pub mod gateway;
pub mod health_service;
pub mod prompt;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use chat::{CompletionResult, EmbeddingVector, Role, Turn};
pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, Result};
pub use gateway::{EmbeddingGateway, ModelGateway};
