//! Orchestration between the HTTP layer, conversation memory and the model
//! gateways.

pub mod context;
pub mod error;

pub use context::{ChatContext, ContextOptions, DEFAULT_CONVERSATION_ID};
pub use error::{ChatContextError, Result};
