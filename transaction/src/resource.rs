//! Boundary to the underlying persistence mechanism.

use std::collections::{HashMap, HashSet};

use nestx_core::ObjectRef;
use thiserror::Error;

use crate::command::PersistenceCommand;
use crate::error::{BoxError, ResourcePhase};

/// A transactional store the coordinator drives.
///
/// The manager holds at most one open resource transaction at a time:
/// `begin` is always followed by exactly one `commit` or `abort`, with any
/// number of `execute` calls in between. Errors are opaque to the
/// coordinator; it stages and reports them without interpreting them.
pub trait TransactionalResource {
    /// Open a resource transaction.
    fn begin(&mut self) -> Result<(), BoxError>;

    /// Apply one command inside the open resource transaction.
    ///
    /// Applied commands must be visible to later reads through the same
    /// resource before commit.
    fn execute(&mut self, command: &PersistenceCommand) -> Result<(), BoxError>;

    /// Make every executed command durable.
    fn commit(&mut self) -> Result<(), BoxError>;

    /// Discard every executed command.
    fn abort(&mut self) -> Result<(), BoxError>;
}

impl<R: TransactionalResource + ?Sized> TransactionalResource for Box<R> {
    fn begin(&mut self) -> Result<(), BoxError> {
        (**self).begin()
    }

    fn execute(&mut self, command: &PersistenceCommand) -> Result<(), BoxError> {
        (**self).execute(command)
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        (**self).commit()
    }

    fn abort(&mut self) -> Result<(), BoxError> {
        (**self).abort()
    }
}

impl<R: TransactionalResource + ?Sized> TransactionalResource for &mut R {
    fn begin(&mut self) -> Result<(), BoxError> {
        (**self).begin()
    }

    fn execute(&mut self, command: &PersistenceCommand) -> Result<(), BoxError> {
        (**self).execute(command)
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        (**self).commit()
    }

    fn abort(&mut self) -> Result<(), BoxError> {
        (**self).abort()
    }
}

/// A call received by a [`RecordingResource`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent {
    Begin,
    Execute(PersistenceCommand),
    Commit,
    Abort,
}

/// Failure injected into a [`RecordingResource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ResourceFault(pub String);

/// Resource that records every call and fails on demand.
///
/// Useful for hosts wiring the coordinator up before a real store exists,
/// and for exercising failure paths. Calls that fail are still recorded.
#[derive(Debug, Default)]
pub struct RecordingResource {
    events: Vec<ResourceEvent>,
    phase_faults: HashMap<ResourcePhase, String>,
    object_faults: HashMap<ObjectRef, String>,
    failed: HashSet<ResourcePhase>,
}

impl RecordingResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call to `phase` fail with `message`.
    pub fn fail_on(&mut self, phase: ResourcePhase, message: impl Into<String>) {
        self.phase_faults.insert(phase, message.into());
    }

    /// Make every later command touching `object` fail with `message`.
    pub fn fail_on_object(&mut self, object: ObjectRef, message: impl Into<String>) {
        self.object_faults.insert(object, message.into());
    }

    /// Remove every injected fault.
    pub fn heal(&mut self) {
        self.phase_faults.clear();
        self.object_faults.clear();
    }

    /// Every call received, in order.
    pub fn events(&self) -> &[ResourceEvent] {
        &self.events
    }

    /// The commands executed, in order.
    pub fn executed(&self) -> Vec<&PersistenceCommand> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ResourceEvent::Execute(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    /// The objects written, in execution order.
    pub fn executed_objects(&self) -> Vec<ObjectRef> {
        self.executed()
            .into_iter()
            .map(|command| command.object().clone())
            .collect()
    }

    pub fn begins(&self) -> usize {
        self.count(&ResourceEvent::Begin)
    }

    pub fn commits(&self) -> usize {
        self.count(&ResourceEvent::Commit)
    }

    pub fn aborts(&self) -> usize {
        self.count(&ResourceEvent::Abort)
    }

    /// Whether an injected fault fired for `phase`.
    pub fn has_failed(&self, phase: ResourcePhase) -> bool {
        self.failed.contains(&phase)
    }

    /// Forget the recorded calls, keeping injected faults.
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.failed.clear();
    }

    fn count(&self, wanted: &ResourceEvent) -> usize {
        self.events.iter().filter(|event| *event == wanted).count()
    }

    fn lifecycle(&mut self, phase: ResourcePhase, event: ResourceEvent) -> Result<(), BoxError> {
        self.events.push(event);
        match self.phase_faults.get(&phase) {
            Some(message) => {
                self.failed.insert(phase);
                Err(Box::new(ResourceFault(message.clone())))
            }
            None => Ok(()),
        }
    }
}

impl TransactionalResource for RecordingResource {
    fn begin(&mut self) -> Result<(), BoxError> {
        self.lifecycle(ResourcePhase::Begin, ResourceEvent::Begin)
    }

    fn execute(&mut self, command: &PersistenceCommand) -> Result<(), BoxError> {
        self.events.push(ResourceEvent::Execute(command.clone()));
        match self.object_faults.get(command.object()) {
            Some(message) => Err(Box::new(ResourceFault(message.clone()))),
            None => Ok(()),
        }
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.lifecycle(ResourcePhase::Commit, ResourceEvent::Commit)
    }

    fn abort(&mut self) -> Result<(), BoxError> {
        self.lifecycle(ResourcePhase::Abort, ResourceEvent::Abort)
    }
}
