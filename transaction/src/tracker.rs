//! Per-transaction change tracking.

use nestx_core::ObjectRef;

use crate::command::PersistenceCommand;

/// Collects the objects changed and disposed by a transaction.
///
/// Consumers (typically a view layer refreshing what it shows) drain each
/// list; a drained entry is never surfaced again. Entries are recorded once
/// per enlistment event, without deduplication.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    changed: Vec<ObjectRef>,
    disposed: Vec<ObjectRef>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an object whose state changed.
    pub fn add_changed(&mut self, object: ObjectRef) {
        self.changed.push(object);
    }

    /// Record an object that was removed.
    pub fn add_disposed(&mut self, object: ObjectRef) {
        self.disposed.push(object);
    }

    /// Record the object written by `command` in the matching list.
    pub fn record(&mut self, command: &PersistenceCommand) {
        if command.disposes() {
            self.add_disposed(command.object().clone());
        } else {
            self.add_changed(command.object().clone());
        }
    }

    /// Return the changed objects and empty the list.
    pub fn drain_changed(&mut self) -> Vec<ObjectRef> {
        std::mem::take(&mut self.changed)
    }

    /// Return the disposed objects and empty the list.
    pub fn drain_disposed(&mut self) -> Vec<ObjectRef> {
        std::mem::take(&mut self.disposed)
    }

    /// Peek at the changed objects without draining them.
    pub fn changed(&self) -> &[ObjectRef] {
        &self.changed
    }

    /// Peek at the disposed objects without draining them.
    pub fn disposed(&self) -> &[ObjectRef] {
        &self.disposed
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.disposed.is_empty()
    }
}
