//! Append-only journal of resource transactions.

use std::collections::HashSet;

use nestx_core::TxnId;
use tracing::debug;

use crate::entry::{JournalEntry, JournalRecord, Lsn};
use crate::error::{JournalError, JournalResult};
use crate::store::ObjectStore;

/// In-memory journal.
#[derive(Debug, Clone)]
pub struct MemoryJournal {
    /// All recorded entries.
    entries: Vec<JournalRecord>,
    /// Next LSN to assign.
    next_lsn: Lsn,
    /// Next transaction ID.
    next_txn_id: TxnId,
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJournal {
    /// Create a new empty memory journal.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_lsn: 1,
            next_txn_id: TxnId::new(1),
        }
    }

    /// Allocate a new transaction ID.
    pub fn alloc_txn_id(&mut self) -> TxnId {
        let id = self.next_txn_id;
        self.next_txn_id = id.next();
        id
    }

    /// Append an entry to the journal.
    pub fn append(&mut self, entry: JournalEntry) -> Lsn {
        let lsn = self.next_lsn;
        self.next_lsn += 1;
        self.entries.push(JournalRecord::new(lsn, entry));
        lsn
    }

    /// Get all entries.
    pub fn entries(&self) -> &[JournalRecord] {
        &self.entries
    }

    /// Get entry by LSN.
    pub fn get(&self, lsn: Lsn) -> Option<&JournalRecord> {
        self.entries.iter().find(|r| r.lsn == lsn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild the object store from committed transactions.
    ///
    /// Entries of aborted or unfinished transactions are skipped. A
    /// committed entry that cannot be applied means the journal is
    /// corrupt and fails the recovery.
    pub fn recover(&self) -> JournalResult<(ObjectStore, RecoveryStats)> {
        let mut stats = RecoveryStats::default();

        // First pass: identify committed transactions
        let mut committed: HashSet<TxnId> = HashSet::new();
        let mut aborted: HashSet<TxnId> = HashSet::new();
        for record in &self.entries {
            if record.entry.is_commit() {
                committed.insert(record.entry.txn());
            } else if record.entry.is_abort() {
                aborted.insert(record.entry.txn());
            }
        }
        stats.committed_transactions = committed.len();
        stats.aborted_transactions = aborted.len();

        // Second pass: replay only committed transactions
        let mut store = ObjectStore::new();
        for record in &self.entries {
            if !committed.contains(&record.entry.txn()) {
                continue;
            }
            let Some(command) = record.entry.to_command() else {
                continue;
            };
            store.apply(&command).map_err(|err| {
                JournalError::recovery_error(format!("lsn {}: {}", record.lsn, err))
            })?;
            stats.entries_replayed += 1;
        }

        debug!(
            committed = stats.committed_transactions,
            aborted = stats.aborted_transactions,
            replayed = stats.entries_replayed,
            "journal recovered"
        );
        Ok((store, stats))
    }

    /// The id after the highest one recorded, so a recovered journal does
    /// not reuse ids.
    pub(crate) fn resume_txn_ids(&mut self) {
        if let Some(max) = self.entries.iter().map(|r| r.entry.txn()).max() {
            if max >= self.next_txn_id {
                self.next_txn_id = max.next();
            }
        }
    }
}

/// Statistics from recovery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryStats {
    /// Number of committed transactions.
    pub committed_transactions: usize,
    /// Number of aborted transactions.
    pub aborted_transactions: usize,
    /// Number of data entries replayed.
    pub entries_replayed: usize,
}
