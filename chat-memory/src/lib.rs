//! In-memory conversation history.
//!
//! A [`ConversationStore`] maps conversation ids to bounded, ordered logs of
//! [`Turn`]s. Each conversation keeps at most `capacity` turns and evicts the
//! oldest ones first. Conversations live for the lifetime of the process
//! unless the optional global cap pushes out the oldest-created ones.

pub mod conversation;
pub mod errors;
pub mod store;

pub use ai_llm_service::{Role, Turn};
pub use conversation::Conversation;
pub use errors::MemoryError;
pub use store::{ConversationHandle, ConversationStore};
