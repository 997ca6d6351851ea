//! Journal-backed transactional resource.

use nestx_core::{Attributes, ObjectRef, TxnId};
use nestx_transaction::{BoxError, PersistenceCommand, TransactionalResource};
use tracing::{debug, trace};

use crate::entry::JournalEntry;
use crate::error::{JournalError, JournalResult};
use crate::journal::{MemoryJournal, RecoveryStats};
use crate::store::ObjectStore;

/// Resource transaction in progress.
#[derive(Debug)]
struct Staged {
    txn: TxnId,
    store: ObjectStore,
}

/// A [`TransactionalResource`] that keeps committed state in memory and
/// records every step in a [`MemoryJournal`].
///
/// Executed commands go to a staged copy of the committed store, so reads
/// through [`get`](Self::get) see them before commit. Commit publishes the
/// staged copy; abort drops it.
#[derive(Debug, Default)]
pub struct JournalResource {
    journal: MemoryJournal,
    committed: ObjectStore,
    staged: Option<Staged>,
}

impl JournalResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild committed state from an existing journal.
    pub fn recover(mut journal: MemoryJournal) -> JournalResult<(Self, RecoveryStats)> {
        let (committed, stats) = journal.recover()?;
        journal.resume_txn_ids();
        let resource = Self {
            journal,
            committed,
            staged: None,
        };
        Ok((resource, stats))
    }

    /// Current state of `object`, including uncommitted changes of the open
    /// resource transaction.
    pub fn get(&self, object: &ObjectRef) -> Option<&Attributes> {
        self.visible().get(object)
    }

    /// Whether `object` exists, including uncommitted changes.
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.visible().contains(object)
    }

    /// Committed state only.
    pub fn committed(&self) -> &ObjectStore {
        &self.committed
    }

    pub fn journal(&self) -> &MemoryJournal {
        &self.journal
    }

    /// Give up the resource and keep its journal.
    pub fn into_journal(self) -> MemoryJournal {
        self.journal
    }

    pub fn is_open(&self) -> bool {
        self.staged.is_some()
    }

    fn visible(&self) -> &ObjectStore {
        match &self.staged {
            Some(staged) => &staged.store,
            None => &self.committed,
        }
    }
}

impl TransactionalResource for JournalResource {
    fn begin(&mut self) -> Result<(), BoxError> {
        if self.staged.is_some() {
            return Err(JournalError::TransactionAlreadyOpen.into());
        }
        let txn = self.journal.alloc_txn_id();
        self.journal.append(JournalEntry::Begin { txn });
        self.staged = Some(Staged {
            txn,
            store: self.committed.clone(),
        });
        debug!(txn = %txn, "resource transaction begun");
        Ok(())
    }

    fn execute(&mut self, command: &PersistenceCommand) -> Result<(), BoxError> {
        let staged = self.staged.as_mut().ok_or(JournalError::NoOpenTransaction)?;
        staged.store.apply(command)?;
        let lsn = self
            .journal
            .append(JournalEntry::from_command(staged.txn, command));
        trace!(txn = %staged.txn, lsn, command = %command, "command journaled");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        let staged = self.staged.take().ok_or(JournalError::NoOpenTransaction)?;
        self.journal.append(JournalEntry::Commit { txn: staged.txn });
        self.committed = staged.store;
        debug!(txn = %staged.txn, objects = self.committed.len(), "resource transaction committed");
        Ok(())
    }

    fn abort(&mut self) -> Result<(), BoxError> {
        if let Some(staged) = self.staged.take() {
            self.journal.append(JournalEntry::Abort { txn: staged.txn });
            debug!(txn = %staged.txn, "resource transaction aborted");
        }
        Ok(())
    }
}
