//! Read-only view of a transaction for diagnostics.

use std::fmt;

use nestx_core::TxnId;
use serde::Serialize;

use crate::transaction::{Transaction, TransactionState};

/// Point-in-time summary of the current transaction.
///
/// Meant for logs and debug output; nothing reads it to make decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionSnapshot {
    pub id: TxnId,
    pub state: TransactionState,
    pub level: usize,
    pub pending_commands: usize,
    pub applied_commands: usize,
    pub failures: Vec<String>,
    pub messages: usize,
    pub warnings: usize,
    pub application_error: Option<String>,
}

impl TransactionSnapshot {
    pub(crate) fn capture(txn: &Transaction, level: usize) -> Self {
        Self {
            id: txn.id(),
            state: txn.state(),
            level,
            pending_commands: txn.pending_commands().len(),
            applied_commands: txn.applied_count(),
            failures: txn.failures().iter().map(|f| f.to_string()).collect(),
            messages: txn.messages().messages().len(),
            warnings: txn.messages().warnings().len(),
            application_error: txn.messages().application_error().map(str::to_owned),
        }
    }
}

impl fmt::Display for TransactionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} level={} pending={} applied={} failures={}",
            self.id,
            self.state,
            self.level,
            self.pending_commands,
            self.applied_commands,
            self.failures.len()
        )?;
        if let Some(error) = &self.application_error {
            write!(f, " error={error:?}")?;
        }
        Ok(())
    }
}
