//! nestx Journal
//!
//! In-memory reference implementation of a transactional resource.
//!
//! Responsibilities:
//! - Append begin/command/commit/abort records to a journal
//! - Stage executed commands so later reads in the same resource
//!   transaction see them
//! - Publish staged state on commit, drop it on abort
//! - Replay committed transactions from the journal on recovery

mod entry;
mod error;
mod journal;
mod resource;
mod store;

pub use entry::{JournalEntry, JournalRecord, Lsn};
pub use error::{JournalError, JournalResult};
pub use journal::{MemoryJournal, RecoveryStats};
pub use resource::JournalResource;
pub use store::ObjectStore;
