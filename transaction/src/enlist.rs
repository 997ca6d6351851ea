//! Enlistment of dirty objects.
//!
//! Application code marks objects dirty as it changes them. At flush time
//! the manager asks the enlistment collaborator to turn every dirty object
//! into exactly one persistence command, clearing the dirty marks.

use std::collections::HashMap;

use nestx_core::{Attributes, ObjectRef};

use crate::command::PersistenceCommand;
use crate::error::BoxError;

/// Source of persistence commands for currently dirty objects.
pub trait Enlistment {
    /// Convert every dirty object into a command and clear its dirty mark.
    ///
    /// Commands come back in the order the objects were first marked dirty.
    fn flush_dirty(&mut self) -> Result<Vec<PersistenceCommand>, BoxError>;

    /// Whether any object is currently dirty.
    fn has_dirty(&self) -> bool;

    /// Drop every dirty mark without producing commands.
    ///
    /// Called when the transaction the marks belong to is aborted.
    fn discard_dirty(&mut self);
}

impl<E: Enlistment + ?Sized> Enlistment for Box<E> {
    fn flush_dirty(&mut self) -> Result<Vec<PersistenceCommand>, BoxError> {
        (**self).flush_dirty()
    }

    fn has_dirty(&self) -> bool {
        (**self).has_dirty()
    }

    fn discard_dirty(&mut self) {
        (**self).discard_dirty()
    }
}

#[derive(Debug, Clone)]
enum PendingChange {
    Created(Attributes),
    Updated(Attributes),
    Deleted,
}

/// In-memory dirty set keeping objects in first-marked order.
///
/// Marks on the same object collapse into one pending change:
/// - created then updated stays a create, carrying the latest state
/// - created then deleted was never persisted, so both marks cancel out
/// - anything else followed by a delete becomes a delete
#[derive(Debug, Clone, Default)]
pub struct DirtyObjects {
    order: Vec<ObjectRef>,
    pending: HashMap<ObjectRef, PendingChange>,
}

impl DirtyObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a new object for creation with its initial state.
    pub fn mark_created(&mut self, object: ObjectRef, state: Attributes) {
        self.mark(object, PendingChange::Created(state));
    }

    /// Mark an existing object as changed.
    pub fn mark_updated(&mut self, object: ObjectRef, state: Attributes) {
        match self.pending.get_mut(&object) {
            Some(PendingChange::Created(pending)) | Some(PendingChange::Updated(pending)) => {
                *pending = state;
            }
            // Already going away; a late update has nothing to write.
            Some(PendingChange::Deleted) => {}
            None => self.mark(object, PendingChange::Updated(state)),
        }
    }

    /// Mark an object for deletion.
    pub fn mark_deleted(&mut self, object: ObjectRef) {
        if let Some(PendingChange::Created(_)) = self.pending.get(&object) {
            self.pending.remove(&object);
            self.order.retain(|o| o != &object);
            return;
        }
        self.mark(object, PendingChange::Deleted);
    }

    /// Whether `object` has a pending change.
    pub fn is_dirty(&self, object: &ObjectRef) -> bool {
        self.pending.contains_key(object)
    }

    /// Number of dirty objects.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Forget every pending change without producing commands.
    pub fn clear(&mut self) {
        self.order.clear();
        self.pending.clear();
    }

    fn mark(&mut self, object: ObjectRef, change: PendingChange) {
        if self.pending.insert(object.clone(), change).is_none() {
            self.order.push(object);
        }
    }

    /// Drain the dirty set into commands, in first-marked order.
    pub fn take_commands(&mut self) -> Vec<PersistenceCommand> {
        let order = std::mem::take(&mut self.order);
        let mut pending = std::mem::take(&mut self.pending);
        order
            .into_iter()
            .filter_map(|object| {
                let change = pending.remove(&object)?;
                Some(match change {
                    PendingChange::Created(state) => PersistenceCommand::create(object, state),
                    PendingChange::Updated(state) => PersistenceCommand::update(object, state),
                    PendingChange::Deleted => PersistenceCommand::delete(object),
                })
            })
            .collect()
    }
}

impl Enlistment for DirtyObjects {
    fn flush_dirty(&mut self) -> Result<Vec<PersistenceCommand>, BoxError> {
        Ok(self.take_commands())
    }

    fn has_dirty(&self) -> bool {
        !self.is_empty()
    }

    fn discard_dirty(&mut self) {
        self.clear();
    }
}
