//! Transaction manager for coordinating nested transactions.
//!
//! The manager owns the "current transaction" slot of one session. Nested
//! `start_transaction`/`end_transaction` pairs share a single transaction;
//! only the outermost `end_transaction` commits.
//!
//! # Nesting
//!
//! ```text
//! NO_TXN  --start--> LEVEL=1 (InProgress)
//! LEVEL=n --start--> LEVEL=n+1              same transaction
//! LEVEL=n --end----> LEVEL=n-1              n > 1, no commit
//! LEVEL=1 --end----> NO_TXN                 Committed, or Aborted + error
//! any     --abort--> NO_TXN                 Aborted
//! ```

use tracing::{debug, info, trace, warn};

use crate::command::PersistenceCommand;
use crate::config::ManagerConfig;
use crate::enlist::{DirtyObjects, Enlistment};
use crate::error::{ResourcePhase, TransactionError, TransactionResult};
use crate::resource::TransactionalResource;
use crate::snapshot::TransactionSnapshot;
use crate::transaction::Transaction;
use nestx_core::TxnId;

/// Coordinates the transactions of one session over one resource.
///
/// The most recently completed transaction stays in the slot for
/// inspection until the next `start_transaction` replaces it.
pub struct TransactionManager<R, E = DirtyObjects> {
    config: ManagerConfig,
    resource: R,
    enlistment: E,
    transaction: Option<Transaction>,
    level: usize,
    next_id: TxnId,
}

impl<R: TransactionalResource> TransactionManager<R, DirtyObjects> {
    /// Create a manager that enlists through an in-memory dirty set.
    pub fn new(resource: R) -> Self {
        Self::with_enlistment(resource, DirtyObjects::new())
    }
}

impl<R: TransactionalResource, E: Enlistment> TransactionManager<R, E> {
    /// Create a manager with a custom enlistment collaborator.
    pub fn with_enlistment(resource: R, enlistment: E) -> Self {
        Self::with_config(resource, enlistment, ManagerConfig::default())
    }

    /// Create a manager with custom configuration.
    pub fn with_config(resource: R, enlistment: E, config: ManagerConfig) -> Self {
        Self {
            config,
            resource,
            enlistment,
            transaction: None,
            level: 0,
            next_id: TxnId::new(1),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    pub fn enlistment(&self) -> &E {
        &self.enlistment
    }

    /// Access the enlistment collaborator, e.g. to mark objects dirty.
    pub fn enlistment_mut(&mut self) -> &mut E {
        &mut self.enlistment
    }

    /// The current or most recently completed transaction.
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Mutable access to the current or most recently completed transaction.
    ///
    /// A completed transaction refuses mutation but can still be drained.
    pub fn transaction_mut(&mut self) -> Option<&mut Transaction> {
        self.transaction.as_mut()
    }

    /// The open transaction.
    pub fn current_mut(&mut self) -> TransactionResult<&mut Transaction> {
        match self.transaction.as_mut() {
            Some(txn) if !txn.is_complete() => Ok(txn),
            _ => Err(TransactionError::NoActiveTransaction),
        }
    }

    /// Current nesting level; 0 when no transaction is open.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Check if a transaction is open.
    pub fn is_in_transaction(&self) -> bool {
        self.level > 0 && self.transaction.as_ref().is_some_and(|t| !t.is_complete())
    }

    /// Diagnostic view of the current or last transaction.
    pub fn snapshot(&self) -> Option<TransactionSnapshot> {
        self.transaction
            .as_ref()
            .map(|txn| TransactionSnapshot::capture(txn, self.level))
    }

    // ========== Transaction Lifecycle ==========

    /// Start a transaction, or join the open one one level deeper.
    ///
    /// A nested start past `max_nesting_level` fails with `NestingTooDeep`.
    pub fn start_transaction(&mut self) -> TransactionResult<()> {
        let needs_new = self
            .transaction
            .as_ref()
            .map_or(true, |txn| txn.is_complete());

        if needs_new {
            self.resource
                .begin()
                .map_err(|err| TransactionError::resource(ResourcePhase::Begin, err))?;
            let id = self.next_id;
            self.next_id = id.next();
            self.transaction =
                Some(Transaction::new(id).with_update_coalescing(self.config.coalesce_updates));
            self.level = 0;
            debug!(txn = %id, "transaction started");
        } else if self.level >= self.config.max_nesting_level {
            return Err(TransactionError::NestingTooDeep {
                level: self.level + 1,
                limit: self.config.max_nesting_level,
            });
        }

        self.level += 1;
        trace!(level = self.level, "transaction level raised");
        Ok(())
    }

    /// Turn dirty objects into commands and apply them to the resource.
    ///
    /// Returns whether any command was applied. Failures are staged on the
    /// transaction and surface from `end_transaction`.
    pub fn flush_transaction(&mut self) -> bool {
        let Self {
            transaction,
            enlistment,
            resource,
            ..
        } = &mut *self;
        match transaction.as_mut() {
            Some(txn) if !txn.is_complete() => flush_dirty_into(txn, enlistment, resource),
            _ => false,
        }
    }

    /// End one nesting level; the outermost end commits.
    ///
    /// Commit runs in three phases, each only if the previous left no
    /// failure: flush dirty objects, commit the transaction, commit the
    /// resource. If anything failed the transaction is aborted and the
    /// failures are raised together.
    pub fn end_transaction(&mut self) -> TransactionResult<()> {
        if self.transaction.is_none() || self.level == 0 {
            self.level = 0;
            warn!("end_transaction called with no transaction running");
            return Err(TransactionError::NoTransactionToEnd);
        }

        self.level -= 1;
        if self.level > 0 {
            let doomed = self
                .transaction
                .as_ref()
                .is_some_and(|txn| txn.has_failures());
            if self.config.fail_fast_nested && doomed {
                debug!(level = self.level, "nested end found staged failures");
                return self.abort_with_failures(Vec::new());
            }
            trace!(level = self.level, "transaction level lowered");
            return Ok(());
        }

        self.commit_all()
    }

    /// Abort the open transaction, discarding everything not committed.
    ///
    /// Objects still marked dirty are dropped from the enlistment. Leaves no
    /// transaction open. Does nothing if none is open.
    pub fn abort_transaction(&mut self) -> TransactionResult<()> {
        let open = self
            .transaction
            .as_ref()
            .is_some_and(|txn| !txn.is_complete());
        if !open {
            self.level = 0;
            return Ok(());
        }
        self.abort_open()
    }

    // ========== Enlistment ==========

    /// Append a prepared command to the open transaction.
    ///
    /// Returns `false` when the command was an update folded into a pending
    /// command for the same object.
    pub fn add_command(&mut self, command: PersistenceCommand) -> TransactionResult<bool> {
        let txn = self.current_mut()?;
        txn.record_change(&command)?;
        txn.add_command(command)
    }

    // ========== Internal Helpers ==========

    fn commit_all(&mut self) -> TransactionResult<()> {
        let Self {
            transaction,
            enlistment,
            resource,
            ..
        } = &mut *self;
        let Some(txn) = transaction.as_mut() else {
            return Err(TransactionError::NoTransactionToEnd);
        };
        let mut unstaged = Vec::new();

        // 1. Flush dirty objects
        if !txn.is_complete() {
            flush_dirty_into(txn, enlistment, resource);
        }

        // 2. Commit the transaction
        if !txn.has_failures() {
            if let Err(err) = txn.commit(resource) {
                // Command failures are staged by the transaction itself.
                if err.is_protocol_error() {
                    unstaged.push(err);
                }
            }
        }

        // 3. Commit the resource
        if !txn.has_failures() && unstaged.is_empty() {
            if let Err(err) = resource.commit() {
                txn.revoke_commit(TransactionError::resource(ResourcePhase::Commit, err));
            }
        }

        if !txn.has_failures() && unstaged.is_empty() {
            info!(
                txn = %txn.id(),
                applied = txn.applied_count(),
                elapsed_ms = u64::try_from(txn.duration().as_millis()).unwrap_or(u64::MAX),
                "transaction committed"
            );
            return Ok(());
        }

        self.abort_with_failures(unstaged)
    }

    fn abort_with_failures(&mut self, unstaged: Vec<TransactionError>) -> TransactionResult<()> {
        let mut failures = self
            .transaction
            .as_ref()
            .map(|txn| txn.failures().to_vec())
            .unwrap_or_default();
        failures.extend(unstaged);

        warn!(failures = failures.len(), "transaction failed, aborting");
        if let Err(err) = self.abort_open() {
            failures.push(err);
        }
        TransactionError::from_failures(failures)
    }

    fn abort_open(&mut self) -> TransactionResult<()> {
        self.level = 0;
        self.enlistment.discard_dirty();
        if let Some(txn) = self.transaction.as_mut() {
            txn.abort()?;
            info!(txn = %txn.id(), "transaction aborted");
        }
        self.resource
            .abort()
            .map_err(|err| TransactionError::resource(ResourcePhase::Abort, err))
    }
}

/// Enlist every dirty object on `txn` and flush the log to `resource`.
fn flush_dirty_into<R, E>(txn: &mut Transaction, enlistment: &mut E, resource: &mut R) -> bool
where
    R: TransactionalResource + ?Sized,
    E: Enlistment + ?Sized,
{
    match enlistment.flush_dirty() {
        Ok(commands) => {
            for command in commands {
                let enlisted = txn
                    .record_change(&command)
                    .and_then(|()| txn.add_command(command));
                if let Err(err) = enlisted {
                    txn.push_failure(err);
                }
            }
        }
        Err(err) => txn.push_failure(TransactionError::enlistment(err)),
    }

    // A failed flush is staged on the transaction.
    matches!(txn.flush(resource), Ok(applied) if applied > 0)
}
