//! Deferred write operations.

use std::fmt;

use nestx_core::{Attributes, ObjectRef};
use serde::{Deserialize, Serialize};

/// The kind of mutation a command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Create => write!(f, "create"),
            CommandKind::Update => write!(f, "update"),
            CommandKind::Delete => write!(f, "delete"),
        }
    }
}

/// One intended mutation of one domain object.
///
/// A command carries the full state it writes, so it can be replayed
/// against a resource without any other context. While a logged command
/// is still pending, a later update of the same object may replace its
/// state.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceCommand {
    /// Persist a new object.
    Create { object: ObjectRef, state: Attributes },
    /// Overwrite the persisted state of an existing object.
    Update { object: ObjectRef, state: Attributes },
    /// Remove a persisted object.
    Delete { object: ObjectRef },
}

impl PersistenceCommand {
    pub fn create(object: ObjectRef, state: Attributes) -> Self {
        Self::Create { object, state }
    }

    pub fn update(object: ObjectRef, state: Attributes) -> Self {
        Self::Update { object, state }
    }

    pub fn delete(object: ObjectRef) -> Self {
        Self::Delete { object }
    }

    /// The object this command writes.
    pub fn object(&self) -> &ObjectRef {
        match self {
            Self::Create { object, .. } | Self::Update { object, .. } | Self::Delete { object } => {
                object
            }
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Create { .. } => CommandKind::Create,
            Self::Update { .. } => CommandKind::Update,
            Self::Delete { .. } => CommandKind::Delete,
        }
    }

    /// The state written, if any. Deletes carry none.
    pub fn state(&self) -> Option<&Attributes> {
        match self {
            Self::Create { state, .. } | Self::Update { state, .. } => Some(state),
            Self::Delete { .. } => None,
        }
    }

    /// Whether this command removes its object.
    pub fn disposes(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }
}

impl fmt::Display for PersistenceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.object())
    }
}
