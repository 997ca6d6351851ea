//! A session and its transaction slot.

use nestx_core::SessionId;
use nestx_transaction::{
    DirtyObjects, Enlistment, TransactionManager, TransactionSnapshot, TransactionalClosure,
    TransactionalResource,
};
use parking_lot::Mutex;

use crate::error::SessionResult;

/// One session: an id and the manager owning its transaction.
///
/// Every operation locks the manager for its whole duration, so start,
/// flush, end and abort never interleave even when the session is shared
/// between threads. Closures passed to [`with_manager`](Self::with_manager),
/// [`in_transaction`](Self::in_transaction) or [`execute`](Self::execute)
/// run under the lock and must not call back into the same session.
pub struct Session<R, E = DirtyObjects> {
    id: SessionId,
    manager: Mutex<TransactionManager<R, E>>,
}

impl<R: TransactionalResource> Session<R, DirtyObjects> {
    /// Session over `resource` with a default manager.
    pub fn new(id: SessionId, resource: R) -> Self {
        Self::with_manager_instance(id, TransactionManager::new(resource))
    }
}

impl<R: TransactionalResource, E: Enlistment> Session<R, E> {
    pub fn with_manager_instance(id: SessionId, manager: TransactionManager<R, E>) -> Self {
        Self {
            id,
            manager: Mutex::new(manager),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn start_transaction(&self) -> SessionResult<()> {
        Ok(self.manager.lock().start_transaction()?)
    }

    pub fn flush_transaction(&self) -> bool {
        self.manager.lock().flush_transaction()
    }

    pub fn end_transaction(&self) -> SessionResult<()> {
        Ok(self.manager.lock().end_transaction()?)
    }

    pub fn abort_transaction(&self) -> SessionResult<()> {
        Ok(self.manager.lock().abort_transaction()?)
    }

    pub fn is_in_transaction(&self) -> bool {
        self.manager.lock().is_in_transaction()
    }

    pub fn level(&self) -> usize {
        self.manager.lock().level()
    }

    pub fn snapshot(&self) -> Option<TransactionSnapshot> {
        self.manager.lock().snapshot()
    }

    /// Run `f` with exclusive access to the manager.
    pub fn with_manager<T>(&self, f: impl FnOnce(&mut TransactionManager<R, E>) -> T) -> T {
        let mut manager = self.manager.lock();
        f(&mut *manager)
    }

    /// Run `closure` within this session's transaction.
    pub fn execute<C>(&self, closure: &mut C) -> SessionResult<C::Output>
    where
        C: TransactionalClosure<R, E> + ?Sized,
    {
        Ok(self.manager.lock().execute_within_transaction(closure)?)
    }

    /// Run `work` within this session's transaction and return its result.
    pub fn in_transaction<T, F>(&self, work: F) -> SessionResult<T>
    where
        F: FnOnce(&mut TransactionManager<R, E>) -> nestx_transaction::TransactionResult<T>,
    {
        Ok(self.manager.lock().in_transaction(work)?)
    }

    pub fn into_manager(self) -> TransactionManager<R, E> {
        self.manager.into_inner()
    }
}
