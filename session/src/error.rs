//! Session error types.

use nestx_core::SessionId;
use nestx_transaction::TransactionError;
use thiserror::Error;

/// Session errors.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// Session not found.
    #[error("session not found: {id}")]
    SessionNotFound { id: SessionId },
}

impl SessionError {
    pub fn session_not_found(id: SessionId) -> Self {
        Self::SessionNotFound { id }
    }

    /// The underlying transaction error, if any.
    pub fn as_transaction(&self) -> Option<&TransactionError> {
        match self {
            SessionError::Transaction(err) => Some(err),
            SessionError::SessionNotFound { .. } => None,
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
