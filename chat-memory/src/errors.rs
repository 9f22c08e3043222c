use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// A conversation must be able to hold at least one turn.
    #[error("conversation capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),
}
