//! Transaction lifecycle integration tests.
//!
//! Test modules:
//! - scenarios: single, nested and failing commits end to end
//! - nesting: start/end balance, depth limit, unbalanced ends
//! - abort: discarding work and leaving no transaction open
//! - messages: per-transaction messages and change tracking

use nestx_tests::prelude::*;
use pretty_assertions::assert_eq;

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_level_commit() {
        // GIVEN
        let mut manager = recording_manager();
        let order = obj("Order", 1);

        // WHEN
        manager.start_transaction().unwrap();
        manager
            .enlistment_mut()
            .mark_updated(order.clone(), attrs! { "total" => 10 });
        manager.end_transaction().unwrap();

        // THEN
        assert_eq!(
            manager.resource().events(),
            &[
                ResourceEvent::Begin,
                ResourceEvent::Execute(PersistenceCommand::update(
                    order,
                    attrs! { "total" => 10 }
                )),
                ResourceEvent::Commit,
            ]
        );
        assert_eq!(
            manager.transaction().unwrap().state(),
            TransactionState::Committed
        );
        assert!(!manager.is_in_transaction());
    }

    #[test]
    fn test_nested_commit_waits_for_outermost_end() {
        // GIVEN
        let mut manager = recording_manager();
        let customer = obj("Customer", 2);
        manager.start_transaction().unwrap();
        manager.start_transaction().unwrap();
        manager
            .enlistment_mut()
            .mark_updated(customer.clone(), attrs! { "name" => "Ada" });

        // WHEN
        manager.end_transaction().unwrap();

        // THEN
        assert_eq!(manager.resource().commits(), 0);
        assert_eq!(manager.level(), 1);

        manager.end_transaction().unwrap();
        assert_eq!(manager.resource().commits(), 1);
        assert_eq!(manager.resource().executed_objects(), vec![customer]);
    }

    #[test]
    fn test_failed_flush_aborts_at_end() {
        // GIVEN
        let mut manager = recording_manager();
        let invoice = obj("Invoice", 3);
        manager
            .resource_mut()
            .fail_on_object(invoice.clone(), "disk quota exceeded");
        manager.start_transaction().unwrap();
        manager.enlistment_mut().mark_updated(invoice, attrs!());

        // WHEN
        let flushed = manager.flush_transaction();
        let err = manager.end_transaction().unwrap_err();

        // THEN
        assert!(!flushed);
        assert!(err.to_string().contains("disk quota exceeded"));
        assert_eq!(manager.resource().aborts(), 1);
        assert_eq!(manager.resource().commits(), 0);
        assert_eq!(
            manager.transaction().unwrap().state(),
            TransactionState::Aborted
        );
        assert_eq!(manager.level(), 0);
    }
}

mod nesting {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_balanced_nesting_issues_one_begin_and_commit() {
        let mut manager = recording_manager();

        for _ in 0..5 {
            manager.start_transaction().unwrap();
        }
        assert_eq!(manager.level(), 5);
        for _ in 0..5 {
            manager.end_transaction().unwrap();
        }

        assert_eq!(manager.resource().begins(), 1);
        assert_eq!(manager.resource().commits(), 1);
        assert_eq!(manager.level(), 0);
    }

    #[test]
    fn test_end_without_start_fails() {
        let mut manager = recording_manager();

        let err = manager.end_transaction().unwrap_err();

        assert!(matches!(err, TransactionError::NoTransactionToEnd));
        assert_eq!(err.to_string(), "no transaction running to end");
    }

    #[test]
    fn test_extra_end_after_commit_fails() {
        // GIVEN
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager.end_transaction().unwrap();

        // WHEN
        let err = manager.end_transaction().unwrap_err();

        // THEN
        assert!(matches!(err, TransactionError::NoTransactionToEnd));
        assert_eq!(manager.level(), 0);
        assert_eq!(manager.resource().commits(), 1);
    }

    #[test]
    fn test_nesting_limit() {
        // GIVEN
        let config = ManagerConfig::new().with_max_nesting_level(2);
        let mut manager =
            TransactionManager::with_config(RecordingResource::new(), DirtyObjects::new(), config);
        manager.start_transaction().unwrap();
        manager.start_transaction().unwrap();

        // WHEN
        let err = manager.start_transaction().unwrap_err();

        // THEN
        assert!(matches!(
            err,
            TransactionError::NestingTooDeep { level: 3, limit: 2 }
        ));
        assert_eq!(manager.level(), 2);
    }

    #[test]
    fn test_new_transaction_after_commit() {
        // GIVEN
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager.current_mut().unwrap().add_message("saved").unwrap();
        manager.end_transaction().unwrap();

        // WHEN
        manager.start_transaction().unwrap();

        // THEN
        let txn = manager.transaction().unwrap();
        assert_eq!(txn.id(), TxnId::new(2));
        assert!(txn.messages().messages().is_empty());
        assert_eq!(manager.resource().begins(), 2);
    }

    #[test]
    fn test_nested_failure_waits_for_outermost_end_by_default() {
        // GIVEN
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager.start_transaction().unwrap();
        manager
            .current_mut()
            .unwrap()
            .stage_failure(TransactionError::application("credit check failed"))
            .unwrap();

        // WHEN
        let inner = manager.end_transaction();

        // THEN
        assert!(inner.is_ok());
        assert_eq!(manager.resource().aborts(), 0);
        let outer = manager.end_transaction().unwrap_err();
        assert_eq!(outer.to_string(), "credit check failed");
        assert_eq!(manager.resource().aborts(), 1);
    }

    #[test]
    fn test_fail_fast_nested_aborts_at_inner_end() {
        // GIVEN
        let config = ManagerConfig::new().with_fail_fast_nested(true);
        let mut manager =
            TransactionManager::with_config(RecordingResource::new(), DirtyObjects::new(), config);
        manager.start_transaction().unwrap();
        manager.start_transaction().unwrap();
        manager
            .current_mut()
            .unwrap()
            .stage_failure(TransactionError::application("credit check failed"))
            .unwrap();

        // WHEN
        let inner = manager.end_transaction().unwrap_err();

        // THEN
        assert_eq!(inner.to_string(), "credit check failed");
        assert_eq!(manager.resource().aborts(), 1);
        assert_eq!(manager.level(), 0);
        assert!(matches!(
            manager.end_transaction(),
            Err(TransactionError::NoTransactionToEnd)
        ));
    }
}

mod abort {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_abort_discards_enlisted_work() {
        // GIVEN
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager
            .add_command(PersistenceCommand::create(obj("Order", 1), attrs!()))
            .unwrap();

        // WHEN
        manager.abort_transaction().unwrap();

        // THEN
        assert!(manager.resource().executed().is_empty());
        assert_eq!(manager.resource().aborts(), 1);
        assert!(!manager.is_in_transaction());
        assert_eq!(
            manager.transaction().unwrap().state(),
            TransactionState::Aborted
        );
    }

    #[test]
    fn test_abort_drops_unflushed_dirty_marks() {
        // GIVEN
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager.enlistment_mut().mark_updated(obj("Item", 1), attrs!());
        manager.abort_transaction().unwrap();

        // WHEN
        manager.start_transaction().unwrap();
        manager.end_transaction().unwrap();

        // THEN
        assert!(manager.enlistment().is_empty());
        assert!(manager.resource().executed().is_empty());
        assert_eq!(manager.resource().commits(), 1);
    }

    #[test]
    fn test_failed_commit_drops_remaining_dirty_marks() {
        // GIVEN
        let mut manager = TransactionManager::with_enlistment(
            RecordingResource::new(),
            ScriptedEnlistment::new().then_fail("index offline"),
        );
        manager.start_transaction().unwrap();
        manager
            .enlistment_mut()
            .dirty_mut()
            .mark_updated(obj("Item", 2), attrs!());
        assert!(manager.end_transaction().is_err());

        // WHEN
        manager.start_transaction().unwrap();
        manager.end_transaction().unwrap();

        // THEN
        assert!(manager.resource().executed().is_empty());
    }

    #[test]
    fn test_abort_from_nested_level_closes_everything() {
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager.start_transaction().unwrap();
        manager.start_transaction().unwrap();

        manager.abort_transaction().unwrap();

        assert_eq!(manager.level(), 0);
        assert!(matches!(
            manager.end_transaction(),
            Err(TransactionError::NoTransactionToEnd)
        ));
    }

    #[test]
    fn test_abort_without_transaction_is_noop() {
        let mut manager = recording_manager();

        manager.abort_transaction().unwrap();
        manager.abort_transaction().unwrap();

        assert!(manager.resource().events().is_empty());
    }

    #[test]
    fn test_abort_after_commit_is_noop() {
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager.end_transaction().unwrap();

        manager.abort_transaction().unwrap();

        assert_eq!(manager.resource().aborts(), 0);
        assert_eq!(
            manager.transaction().unwrap().state(),
            TransactionState::Committed
        );
    }

    #[test]
    fn test_completed_transaction_rejects_commands() {
        // GIVEN
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager.end_transaction().unwrap();

        // WHEN
        let txn = manager.transaction_mut().unwrap();
        let err = txn
            .add_command(PersistenceCommand::delete(obj("Order", 1)))
            .unwrap_err();

        // THEN
        assert!(matches!(err, TransactionError::AlreadyComplete { .. }));
        assert!(matches!(
            txn.abort(),
            Err(TransactionError::AlreadyCommitted { .. })
        ));
    }
}

mod messages {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drain_changed_returns_everything_once() {
        // GIVEN
        let mut manager = recording_manager();
        let kept = obj("Item", 1);
        let removed = obj("Item", 2);
        manager.start_transaction().unwrap();
        manager.enlistment_mut().mark_updated(kept.clone(), attrs!());
        manager.enlistment_mut().mark_deleted(removed.clone());
        assert!(manager.flush_transaction());

        // WHEN
        let txn = manager.current_mut().unwrap();
        let first = txn.drain_changed();
        let second = txn.drain_changed();

        // THEN
        assert_eq!(first, vec![kept]);
        assert!(second.is_empty());
        assert_eq!(txn.drain_disposed(), vec![removed]);
    }

    #[test]
    fn test_messages_sealed_after_commit() {
        // GIVEN
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        let txn = manager.current_mut().unwrap();
        txn.add_message("order placed").unwrap();
        txn.add_warning("stock low").unwrap();
        manager.end_transaction().unwrap();

        // WHEN
        let txn = manager.transaction_mut().unwrap();
        let late = txn.add_message("too late");

        // THEN
        assert!(late.is_err());
        assert_eq!(txn.drain_messages(), vec!["order placed".to_string()]);
        assert_eq!(txn.drain_warnings(), vec!["stock low".to_string()]);
        assert!(txn.drain_messages().is_empty());
    }

    #[test]
    fn test_application_error_shown_in_snapshot() {
        // GIVEN
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();

        // WHEN
        manager
            .current_mut()
            .unwrap()
            .set_application_error("quota exceeded")
            .unwrap();
        manager.end_transaction().unwrap();

        // THEN
        let snapshot = manager.snapshot().unwrap();
        assert_eq!(snapshot.application_error.as_deref(), Some("quota exceeded"));
        assert_eq!(
            snapshot.to_string(),
            "txn1 Committed level=0 pending=0 applied=0 failures=0 error=\"quota exceeded\""
        );
        let txn = manager.transaction_mut().unwrap();
        assert!(txn.set_application_error("too late").is_err());
        assert_eq!(
            txn.take_application_error(),
            Some("quota exceeded".to_string())
        );
        assert!(manager.snapshot().unwrap().application_error.is_none());
    }

    #[test]
    fn test_snapshot_of_committed_transaction() {
        let mut manager = recording_manager();
        manager.start_transaction().unwrap();
        manager.enlistment_mut().mark_updated(obj("Item", 1), attrs!());
        manager.end_transaction().unwrap();

        let snapshot = manager.snapshot().unwrap();

        assert_eq!(
            snapshot.to_string(),
            "txn1 Committed level=0 pending=0 applied=1 failures=0"
        );
    }
}
