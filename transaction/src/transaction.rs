//! The unit of work.
//!
//! A transaction owns its command log, its change tracker, its messages and
//! the failures staged against it.
//!
//! # States
//!
//! ```text
//!                  commit()    ┌───────────┐
//!             ┌──────────────▶│ Committed │
//! ┌────────────┐              └───────────┘
//! │ InProgress │
//! └────────────┘   abort()    ┌───────────┐
//!             └──────────────▶│  Aborted  │
//!                              └───────────┘
//! ```
//!
//! Completed transactions are read-only records: they refuse new commands,
//! messages and failures, but consumers may still drain their change tracker
//! and messages.

use std::fmt;
use std::time::{Duration, Instant};

use nestx_core::{ObjectRef, TxnId};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::broker::MessageBroker;
use crate::command::PersistenceCommand;
use crate::error::{TransactionError, TransactionResult};
use crate::resource::TransactionalResource;
use crate::tracker::ChangeTracker;

/// The state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionState {
    /// Commands may be added and flushed.
    InProgress,
    /// All commands were applied and the transaction was committed.
    Committed,
    /// Unapplied commands were discarded.
    Aborted,
}

impl TransactionState {
    /// Returns true once the transaction has committed or aborted.
    pub fn is_complete(&self) -> bool {
        !matches!(self, TransactionState::InProgress)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::InProgress => write!(f, "InProgress"),
            TransactionState::Committed => write!(f, "Committed"),
            TransactionState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// A unit of work.
pub struct Transaction {
    id: TxnId,
    state: TransactionState,
    /// Logged commands not yet applied, in enlistment order.
    pending: Vec<PersistenceCommand>,
    /// Number of commands applied to the resource so far.
    applied: usize,
    coalesce_updates: bool,
    tracker: ChangeTracker,
    broker: MessageBroker,
    failures: Vec<TransactionError>,
    started_at: Instant,
}

impl Transaction {
    /// Create a new in-progress transaction.
    pub fn new(id: TxnId) -> Self {
        Self {
            id,
            state: TransactionState::InProgress,
            pending: Vec::new(),
            applied: 0,
            coalesce_updates: true,
            tracker: ChangeTracker::new(),
            broker: MessageBroker::new(),
            failures: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Enable or disable folding of updates into pending commands.
    ///
    /// When enabled, an update for an object whose last pending command is
    /// a create or an update replaces that command's state instead of being
    /// logged again. The create stays a create.
    pub fn with_update_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_updates = enabled;
        self
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Commands logged but not yet applied.
    pub fn pending_commands(&self) -> &[PersistenceCommand] {
        &self.pending
    }

    /// Number of commands applied to the resource so far.
    pub fn applied_count(&self) -> usize {
        self.applied
    }

    /// How long ago the transaction started.
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    // ========== Command Log ==========

    /// Append a command to the log.
    ///
    /// Returns `false` when the command was an update folded into the
    /// pending command for the same object. The pending command then
    /// carries the update's state.
    pub fn add_command(&mut self, command: PersistenceCommand) -> TransactionResult<bool> {
        self.ensure_in_progress()?;

        let command = if self.coalesce_updates {
            match self.fold_update(command) {
                Ok(()) => return Ok(false),
                Err(command) => command,
            }
        } else {
            command
        };

        trace!(txn = %self.id, %command, "command enlisted");
        self.pending.push(command);
        Ok(true)
    }

    /// Apply every pending command to `resource`, in enlistment order.
    ///
    /// Returns how many commands were applied. Commands applied by an
    /// earlier flush are never applied again. A failing command stops the
    /// flush; it and every command after it stay pending and the failure is
    /// staged on the transaction as well as returned. Once a failure is
    /// staged the transaction can only abort, so later flushes apply nothing.
    pub fn flush<R>(&mut self, resource: &mut R) -> TransactionResult<usize>
    where
        R: TransactionalResource + ?Sized,
    {
        self.ensure_in_progress()?;

        if self.has_failures() {
            debug!(txn = %self.id, "flush skipped, transaction must abort");
            return Ok(0);
        }

        let mut done = 0;
        let mut failure = None;
        for command in &self.pending {
            match resource.execute(command) {
                Ok(()) => done += 1,
                Err(err) => {
                    failure = Some(TransactionError::command(command, err));
                    break;
                }
            }
        }

        self.pending.drain(..done);
        self.applied += done;

        if let Some(err) = failure {
            warn!(txn = %self.id, error = %err, "flush failed");
            self.failures.push(err.clone());
            return Err(err);
        }

        if done > 0 {
            debug!(txn = %self.id, applied = done, "flushed commands");
        }
        Ok(done)
    }

    /// Apply the remaining commands and mark the transaction committed.
    ///
    /// Rejected if the transaction is complete or already has staged
    /// failures.
    pub fn commit<R>(&mut self, resource: &mut R) -> TransactionResult<()>
    where
        R: TransactionalResource + ?Sized,
    {
        self.ensure_in_progress()?;
        TransactionError::from_failures(self.failures.clone())?;

        self.flush(resource)?;
        self.state = TransactionState::Committed;

        debug!(
            txn = %self.id,
            applied = self.applied,
            messages = self.broker.messages().len(),
            warnings = self.broker.warnings().len(),
            "transaction committed"
        );
        Ok(())
    }

    /// Discard the pending commands and mark the transaction aborted.
    ///
    /// Aborting an aborted transaction does nothing.
    pub fn abort(&mut self) -> TransactionResult<()> {
        match self.state {
            TransactionState::Committed => Err(TransactionError::AlreadyCommitted { id: self.id }),
            TransactionState::Aborted => Ok(()),
            TransactionState::InProgress => {
                let discarded = self.pending.len();
                self.pending.clear();
                self.state = TransactionState::Aborted;
                debug!(txn = %self.id, discarded, "transaction aborted");
                Ok(())
            }
        }
    }

    /// Turn a commit the resource refused into an abort.
    ///
    /// The resource discards what it was asked to commit, so the record must
    /// not claim otherwise.
    pub(crate) fn revoke_commit(&mut self, failure: TransactionError) {
        debug_assert_eq!(self.state, TransactionState::Committed);
        self.failures.push(failure);
        self.state = TransactionState::Aborted;
    }

    // ========== Failures ==========

    /// Stage a failure; the transaction will abort when it ends.
    pub fn stage_failure(&mut self, failure: TransactionError) -> TransactionResult<()> {
        self.ensure_in_progress()?;
        self.push_failure(failure);
        Ok(())
    }

    pub(crate) fn push_failure(&mut self, failure: TransactionError) {
        warn!(txn = %self.id, error = %failure, "failure staged");
        self.failures.push(failure);
    }

    /// Failures staged so far, oldest first. Reading does not clear them.
    pub fn failures(&self) -> &[TransactionError] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    // ========== Change Tracking ==========

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Record the object written by `command`.
    pub fn record_change(&mut self, command: &PersistenceCommand) -> TransactionResult<()> {
        self.ensure_in_progress()?;
        self.tracker.record(command);
        Ok(())
    }

    pub fn drain_changed(&mut self) -> Vec<ObjectRef> {
        self.tracker.drain_changed()
    }

    pub fn drain_disposed(&mut self) -> Vec<ObjectRef> {
        self.tracker.drain_disposed()
    }

    // ========== Messages ==========

    pub fn messages(&self) -> &MessageBroker {
        &self.broker
    }

    pub fn add_message(&mut self, message: impl Into<String>) -> TransactionResult<()> {
        self.ensure_in_progress()?;
        self.broker.add_message(message);
        Ok(())
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) -> TransactionResult<()> {
        self.ensure_in_progress()?;
        self.broker.add_warning(warning);
        Ok(())
    }

    /// Record the application-level error of this transaction.
    ///
    /// It is reported by snapshots and does not abort the transaction.
    pub fn set_application_error(&mut self, error: impl Into<String>) -> TransactionResult<()> {
        self.ensure_in_progress()?;
        self.broker.set_application_error(error);
        Ok(())
    }

    pub fn drain_messages(&mut self) -> Vec<String> {
        self.broker.drain_messages()
    }

    pub fn drain_warnings(&mut self) -> Vec<String> {
        self.broker.drain_warnings()
    }

    pub fn take_application_error(&mut self) -> Option<String> {
        self.broker.take_application_error()
    }

    // ========== Internal Helpers ==========

    fn ensure_in_progress(&self) -> TransactionResult<()> {
        if self.state.is_complete() {
            return Err(TransactionError::AlreadyComplete {
                id: self.id,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Move the state of an update into the last pending create or update
    /// of its object. Hands the command back when there is none.
    fn fold_update(&mut self, command: PersistenceCommand) -> Result<(), PersistenceCommand> {
        let (object, state) = match command {
            PersistenceCommand::Update { object, state } => (object, state),
            other => return Err(other),
        };
        let last = self.pending.iter_mut().rev().find(|c| c.object() == &object);
        match last {
            Some(PersistenceCommand::Create { state: pending, .. })
            | Some(PersistenceCommand::Update { state: pending, .. }) => {
                *pending = state;
                trace!(txn = %self.id, %object, "update folded into pending command");
                Ok(())
            }
            _ => Err(PersistenceCommand::Update { object, state }),
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("applied", &self.applied)
            .field("failures", &self.failures.len())
            .finish()
    }
}
