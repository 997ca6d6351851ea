//! Object state keyed by handle.

use std::collections::HashMap;

use nestx_core::{Attributes, ObjectRef};
use nestx_transaction::PersistenceCommand;

use crate::error::{JournalError, JournalResult};

/// Persisted object states.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectStore {
    objects: HashMap<ObjectRef, Attributes>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: &ObjectRef) -> Option<&Attributes> {
        self.objects.get(object)
    }

    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.objects.contains_key(object)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Apply one command.
    ///
    /// Creates must target a new object; updates and deletes an existing
    /// one.
    pub fn apply(&mut self, command: &PersistenceCommand) -> JournalResult<()> {
        match command {
            PersistenceCommand::Create { object, state } => {
                if self.objects.contains_key(object) {
                    return Err(JournalError::ObjectExists(object.clone()));
                }
                self.objects.insert(object.clone(), state.clone());
            }
            PersistenceCommand::Update { object, state } => {
                let slot = self
                    .objects
                    .get_mut(object)
                    .ok_or_else(|| JournalError::ObjectNotFound(object.clone()))?;
                *slot = state.clone();
            }
            PersistenceCommand::Delete { object } => {
                self.objects
                    .remove(object)
                    .ok_or_else(|| JournalError::ObjectNotFound(object.clone()))?;
            }
        }
        Ok(())
    }
}
