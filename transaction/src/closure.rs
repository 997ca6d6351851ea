//! Running application code within a transaction.

use tracing::warn;

use crate::enlist::Enlistment;
use crate::error::{TransactionError, TransactionResult};
use crate::manager::TransactionManager;
use crate::resource::TransactionalResource;

/// Application work that must run inside a transaction.
///
/// Only `execute` is required; the hooks default to doing nothing. The
/// associated `Output` is what `execute` hands back on success; use `()`
/// for work that returns nothing.
pub trait TransactionalClosure<R, E> {
    type Output;

    /// Short description used in error messages.
    fn description(&self) -> String {
        "transactional closure".to_string()
    }

    /// Runs before `execute`.
    fn pre_execute(&mut self) {}

    /// The work itself.
    fn execute(&mut self, manager: &mut TransactionManager<R, E>)
        -> TransactionResult<Self::Output>;

    /// Runs after `execute` succeeded, before the transaction ends.
    fn on_success(&mut self) {}

    /// Runs after `execute` or the commit failed, before the abort.
    fn on_failure(&mut self) {}
}

/// Adapts a `FnOnce` into a [`TransactionalClosure`].
pub struct FnClosure<F> {
    description: String,
    work: Option<F>,
}

impl<F> FnClosure<F> {
    pub fn new(description: impl Into<String>, work: F) -> Self {
        Self {
            description: description.into(),
            work: Some(work),
        }
    }
}

impl<R, E, F, T> TransactionalClosure<R, E> for FnClosure<F>
where
    F: FnOnce(&mut TransactionManager<R, E>) -> TransactionResult<T>,
{
    type Output = T;

    fn description(&self) -> String {
        self.description.clone()
    }

    fn execute(&mut self, manager: &mut TransactionManager<R, E>) -> TransactionResult<T> {
        match self.work.take() {
            Some(work) => work(manager),
            None => Err(TransactionError::application(format!(
                "{} already executed",
                self.description
            ))),
        }
    }
}

impl<R: TransactionalResource, E: Enlistment> TransactionManager<R, E> {
    /// Run `closure` within a transaction.
    ///
    /// If a transaction is already open the closure joins it and the
    /// caller that opened it stays responsible for ending it. Otherwise a
    /// transaction is started, and ended after `on_success`; on failure
    /// `on_failure` runs and the transaction is aborted. The failure is
    /// always returned. If the abort fails too, the returned error carries
    /// both.
    pub fn execute_within_transaction<C>(&mut self, closure: &mut C) -> TransactionResult<C::Output>
    where
        C: TransactionalClosure<R, E> + ?Sized,
    {
        let joined = self.is_in_transaction();
        if !joined {
            self.start_transaction()?;
        }

        closure.pre_execute();
        let failure = match closure.execute(self) {
            Ok(output) => {
                closure.on_success();
                if joined {
                    return Ok(output);
                }
                match self.end_transaction() {
                    Ok(()) => return Ok(output),
                    Err(err) => err,
                }
            }
            Err(err) => err,
        };

        closure.on_failure();
        if joined {
            return Err(failure);
        }

        match self.abort_transaction() {
            Ok(()) => Err(failure),
            Err(abort_err) => {
                warn!(error = %abort_err, "abort after failure failed");
                Err(TransactionError::abort_failed(
                    closure.description(),
                    &failure,
                    abort_err,
                ))
            }
        }
    }

    /// Run `work` within a transaction and return its result.
    ///
    /// Same semantics as [`execute_within_transaction`](Self::execute_within_transaction).
    pub fn in_transaction<T, F>(&mut self, work: F) -> TransactionResult<T>
    where
        F: FnOnce(&mut Self) -> TransactionResult<T>,
    {
        let mut closure = FnClosure::new("transactional closure", work);
        self.execute_within_transaction(&mut closure)
    }
}
