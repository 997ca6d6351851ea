//! Open sessions by id.

use std::collections::HashMap;
use std::sync::Arc;

use nestx_core::SessionId;
use nestx_transaction::{DirtyObjects, Enlistment, TransactionManager, TransactionalResource};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{SessionError, SessionResult};
use crate::session::Session;

/// Registry of open sessions.
pub struct SessionRegistry<R, E = DirtyObjects> {
    sessions: RwLock<HashMap<SessionId, Arc<Session<R, E>>>>,
    next_id: RwLock<SessionId>,
}

impl<R, E> Default for SessionRegistry<R, E> {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: RwLock::new(SessionId::new(1)),
        }
    }
}

impl<R: TransactionalResource, E: Enlistment> SessionRegistry<R, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session around `manager` and return it.
    pub fn open(&self, manager: TransactionManager<R, E>) -> Arc<Session<R, E>> {
        let id = {
            let mut next = self.next_id.write();
            let id = *next;
            *next = SessionId::new(id.raw() + 1);
            id
        };
        let session = Arc::new(Session::with_manager_instance(id, manager));
        self.sessions.write().insert(id, Arc::clone(&session));
        debug!(session = %id, "session opened");
        session
    }

    pub fn get(&self, id: SessionId) -> SessionResult<Arc<Session<R, E>>> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| SessionError::session_not_found(id))
    }

    /// Close a session, aborting its transaction if one is still open.
    pub fn close(&self, id: SessionId) -> SessionResult<()> {
        let session = self
            .sessions
            .write()
            .remove(&id)
            .ok_or_else(|| SessionError::session_not_found(id))?;
        if session.is_in_transaction() {
            warn!(session = %id, "closing session with open transaction");
            session.abort_transaction()?;
        }
        debug!(session = %id, "session closed");
        Ok(())
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
