//! nestx Transaction
//!
//! Nested, session-scoped unit-of-work coordination above a pluggable
//! transactional resource.
//!
//! Responsibilities:
//! - Track deferred writes as persistence commands (command log)
//! - Collect changed and disposed objects for downstream consumers
//! - Implement START/FLUSH/END/ABORT with a nesting counter
//! - Drive the three-phase commit: flush dirty objects, commit the
//!   transaction, commit the resource
//! - Aggregate every failure raised along the way into one error

mod broker;
mod closure;
mod command;
mod config;
mod enlist;
mod error;
mod manager;
mod resource;
mod snapshot;
mod tracker;
mod transaction;

pub use broker::MessageBroker;
pub use closure::{FnClosure, TransactionalClosure};
pub use command::{CommandKind, PersistenceCommand};
pub use config::ManagerConfig;
pub use enlist::{DirtyObjects, Enlistment};
pub use error::{
    BoxError, CompositeError, ResourcePhase, SharedError, TransactionError, TransactionResult,
};
pub use manager::TransactionManager;
pub use resource::{RecordingResource, ResourceEvent, ResourceFault, TransactionalResource};
pub use snapshot::TransactionSnapshot;
pub use tracker::ChangeTracker;
pub use transaction::{Transaction, TransactionState};
