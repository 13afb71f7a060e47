//! Error types for arena growth and heap initialization.

use thiserror::Error;

/// Errors raised by an [`Arena`](crate::Arena) or while setting up a [`Heap`](crate::Heap).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The growth primitive refused or failed to extend the arena.
  #[error("out of memory: arena could not grow by {requested} bytes")]
  OutOfMemory {
    /// Number of bytes that were asked for.
    requested: usize,
  },

  /// The request itself was malformed, e.g. a negative growth increment.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),
}

/// Result type for arena and heap operations.
pub type Result<T> = std::result::Result<T, AllocError>;
