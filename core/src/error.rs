//! Common error types for nestx.

use thiserror::Error;

/// Errors raised while building core handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An object reference string did not have the `Type#id` shape.
    #[error("invalid object reference: {input}")]
    InvalidObjectRef { input: String },

    /// A type name was empty.
    #[error("type name must not be empty")]
    EmptyTypeName,
}

impl CoreError {
    pub fn invalid_object_ref(input: impl Into<String>) -> Self {
        Self::InvalidObjectRef {
            input: input.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
