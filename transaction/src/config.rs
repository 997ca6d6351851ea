//! Transaction manager configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the transaction manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Deepest nested level `start_transaction` accepts.
    ///
    /// Only nested starts are checked. The outermost start always opens
    /// level 1, so a limit of 0 behaves like 1.
    pub max_nesting_level: usize,
    /// Fold an update into the pending create or update of the same object.
    pub coalesce_updates: bool,
    /// Abort as soon as a nested `end_transaction` finds staged failures,
    /// instead of waiting for the outermost end.
    pub fail_fast_nested: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_nesting_level: 64,
            coalesce_updates: true,
            fail_fast_nested: false,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nesting_level(mut self, level: usize) -> Self {
        self.max_nesting_level = level;
        self
    }

    pub fn with_coalesce_updates(mut self, enabled: bool) -> Self {
        self.coalesce_updates = enabled;
        self
    }

    pub fn with_fail_fast_nested(mut self, enabled: bool) -> Self {
        self.fail_fast_nested = enabled;
        self
    }
}
