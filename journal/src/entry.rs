//! Journal entry types.

use nestx_core::{Attributes, ObjectRef, TxnId};
use nestx_transaction::PersistenceCommand;

/// Log Sequence Number - unique identifier for each journal record.
pub type Lsn = u64;

/// Journal entry types.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    /// Begin a resource transaction.
    Begin { txn: TxnId },

    /// Commit a resource transaction.
    Commit { txn: TxnId },

    /// Abort a resource transaction.
    Abort { txn: TxnId },

    /// Persist a new object.
    Create {
        txn: TxnId,
        object: ObjectRef,
        state: Attributes,
    },

    /// Overwrite an object's state.
    Update {
        txn: TxnId,
        object: ObjectRef,
        state: Attributes,
    },

    /// Remove an object.
    Delete { txn: TxnId, object: ObjectRef },
}

impl JournalEntry {
    /// Record `command` as executed by `txn`.
    pub fn from_command(txn: TxnId, command: &PersistenceCommand) -> Self {
        match command {
            PersistenceCommand::Create { object, state } => JournalEntry::Create {
                txn,
                object: object.clone(),
                state: state.clone(),
            },
            PersistenceCommand::Update { object, state } => JournalEntry::Update {
                txn,
                object: object.clone(),
                state: state.clone(),
            },
            PersistenceCommand::Delete { object } => JournalEntry::Delete {
                txn,
                object: object.clone(),
            },
        }
    }

    /// The command this entry replays, if it is a data entry.
    pub fn to_command(&self) -> Option<PersistenceCommand> {
        match self {
            JournalEntry::Create { object, state, .. } => {
                Some(PersistenceCommand::create(object.clone(), state.clone()))
            }
            JournalEntry::Update { object, state, .. } => {
                Some(PersistenceCommand::update(object.clone(), state.clone()))
            }
            JournalEntry::Delete { object, .. } => Some(PersistenceCommand::delete(object.clone())),
            JournalEntry::Begin { .. } | JournalEntry::Commit { .. } | JournalEntry::Abort { .. } => {
                None
            }
        }
    }

    /// Get the transaction ID for this entry.
    pub fn txn(&self) -> TxnId {
        match self {
            JournalEntry::Begin { txn }
            | JournalEntry::Commit { txn }
            | JournalEntry::Abort { txn }
            | JournalEntry::Create { txn, .. }
            | JournalEntry::Update { txn, .. }
            | JournalEntry::Delete { txn, .. } => *txn,
        }
    }

    pub fn is_commit(&self) -> bool {
        matches!(self, JournalEntry::Commit { .. })
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, JournalEntry::Abort { .. })
    }
}

/// A journal entry with its LSN.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalRecord {
    pub lsn: Lsn,
    pub entry: JournalEntry,
}

impl JournalRecord {
    pub fn new(lsn: Lsn, entry: JournalEntry) -> Self {
        Self { lsn, entry }
    }
}
