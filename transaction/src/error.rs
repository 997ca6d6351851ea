//! Transaction error types.

use std::fmt;
use std::sync::Arc;

use nestx_core::{ObjectRef, TxnId};
use thiserror::Error;

use crate::command::{CommandKind, PersistenceCommand};
use crate::transaction::TransactionState;

/// Opaque error raised by an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Collaborator error once staged on a transaction.
///
/// Staged failures are shared between the transaction record and the error
/// handed back to the caller, so both observe the same underlying failure.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Resource hook that raised a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourcePhase {
    Begin,
    Commit,
    Abort,
}

impl fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourcePhase::Begin => write!(f, "begin"),
            ResourcePhase::Commit => write!(f, "commit"),
            ResourcePhase::Abort => write!(f, "abort"),
        }
    }
}

fn share(err: impl Into<BoxError>) -> SharedError {
    let err: BoxError = err.into();
    Arc::from(err)
}

/// Transaction errors.
#[derive(Debug, Clone, Error)]
pub enum TransactionError {
    /// `end_transaction` without a matching `start_transaction`.
    #[error("no transaction running to end")]
    NoTransactionToEnd,

    /// An operation needed an open transaction and there was none.
    #[error("no transaction is active")]
    NoActiveTransaction,

    /// Mutation attempted on a committed or aborted transaction.
    #[error("transaction {id} already complete ({state})")]
    AlreadyComplete { id: TxnId, state: TransactionState },

    /// Abort requested on a committed transaction.
    #[error("transaction {id} already committed, cannot abort")]
    AlreadyCommitted { id: TxnId },

    /// `start_transaction` nested deeper than the configured limit.
    #[error("nesting level {level} exceeds the limit of {limit}")]
    NestingTooDeep { level: usize, limit: usize },

    /// The enlistment collaborator failed to produce commands.
    #[error("enlistment failed: {source}")]
    Enlistment { source: SharedError },

    /// The resource rejected a persistence command.
    #[error("{kind} of {object} failed: {source}")]
    Command {
        kind: CommandKind,
        object: ObjectRef,
        source: SharedError,
    },

    /// A resource lifecycle hook failed.
    #[error("resource {phase} failed: {source}")]
    Resource {
        phase: ResourcePhase,
        source: SharedError,
    },

    /// Application code running inside the transaction failed.
    #[error("{source}")]
    Application { source: SharedError },

    /// Aborting after a failure failed as well.
    #[error("failed to abort {description} after: {cause}; {source}")]
    AbortFailed {
        description: String,
        cause: String,
        source: Box<TransactionError>,
    },

    /// Several failures raised while ending one transaction.
    #[error("{0}")]
    Composite(CompositeError),
}

impl TransactionError {
    pub fn enlistment(err: impl Into<BoxError>) -> Self {
        Self::Enlistment { source: share(err) }
    }

    pub fn command(command: &PersistenceCommand, err: impl Into<BoxError>) -> Self {
        Self::Command {
            kind: command.kind(),
            object: command.object().clone(),
            source: share(err),
        }
    }

    pub fn resource(phase: ResourcePhase, err: impl Into<BoxError>) -> Self {
        Self::Resource {
            phase,
            source: share(err),
        }
    }

    pub fn application(err: impl Into<BoxError>) -> Self {
        Self::Application { source: share(err) }
    }

    pub fn abort_failed(
        description: impl Into<String>,
        cause: &TransactionError,
        abort_error: TransactionError,
    ) -> Self {
        Self::AbortFailed {
            description: description.into(),
            cause: cause.to_string(),
            source: Box::new(abort_error),
        }
    }

    /// Combine failures into a single outcome.
    ///
    /// No failures is success, one failure is returned unwrapped, and more
    /// than one become a [`CompositeError`].
    pub fn from_failures(mut failures: Vec<TransactionError>) -> TransactionResult<()> {
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Self::Composite(CompositeError::new(failures))),
        }
    }

    /// Whether this error signals a caller bug rather than a runtime failure.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::NoTransactionToEnd
                | Self::NoActiveTransaction
                | Self::AlreadyComplete { .. }
                | Self::AlreadyCommitted { .. }
                | Self::NestingTooDeep { .. }
        )
    }

    /// The constituent failures: itself, or each member of a composite.
    pub fn failures(&self) -> Vec<&TransactionError> {
        match self {
            Self::Composite(composite) => composite.errors().iter().collect(),
            other => vec![other],
        }
    }
}

/// Several failures reported as one.
#[derive(Debug, Clone)]
pub struct CompositeError {
    errors: Vec<TransactionError>,
}

impl CompositeError {
    pub fn new(errors: Vec<TransactionError>) -> Self {
        Self { errors }
    }

    /// The failures, in the order they were raised.
    pub fn errors(&self) -> &[TransactionError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for CompositeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeError {}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
