//! Journal error types.

use nestx_core::ObjectRef;
use thiserror::Error;

/// Journal errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JournalError {
    /// Create for an object that already exists.
    #[error("object already exists: {0}")]
    ObjectExists(ObjectRef),

    /// Update or delete for an object that does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectRef),

    /// `begin` while a resource transaction is open.
    #[error("a resource transaction is already open")]
    TransactionAlreadyOpen,

    /// Command or commit without an open resource transaction.
    #[error("no resource transaction is open")]
    NoOpenTransaction,

    /// Recovery error.
    #[error("recovery error: {message}")]
    RecoveryError { message: String },
}

impl JournalError {
    pub fn recovery_error(message: impl Into<String>) -> Self {
        Self::RecoveryError {
            message: message.into(),
        }
    }
}

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
