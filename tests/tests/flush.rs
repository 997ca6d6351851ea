//! Flush integration tests.
//!
//! Flushes apply enlisted commands to the resource before commit, in
//! enlistment order, and never apply the same command twice.

use nestx_tests::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_second_flush_applies_nothing() {
    // GIVEN
    let mut manager = recording_manager();
    manager.start_transaction().unwrap();
    manager.enlistment_mut().mark_updated(obj("Item", 1), attrs!());

    // WHEN
    let first = manager.flush_transaction();
    let second = manager.flush_transaction();

    // THEN
    assert!(first);
    assert!(!second);
    assert_eq!(manager.resource().executed().len(), 1);
}

#[test]
fn test_commands_applied_in_dirty_order() {
    // GIVEN
    let mut manager = recording_manager();
    let (a, b, c) = (obj("Item", 3), obj("Item", 1), obj("Item", 2));
    manager.start_transaction().unwrap();
    for object in [&a, &b, &c] {
        manager.enlistment_mut().mark_updated(object.clone(), attrs!());
    }

    // WHEN
    manager.end_transaction().unwrap();

    // THEN
    assert_eq!(manager.resource().executed_objects(), vec![a, b, c]);
}

#[test]
fn test_flushes_are_cumulative() {
    // GIVEN
    let mut manager = recording_manager();
    let (a, b) = (obj("Item", 1), obj("Item", 2));
    manager.start_transaction().unwrap();
    manager.enlistment_mut().mark_updated(a.clone(), attrs!());
    manager.flush_transaction();
    manager.enlistment_mut().mark_updated(b.clone(), attrs!());
    manager.flush_transaction();

    // WHEN
    manager.end_transaction().unwrap();

    // THEN
    assert_eq!(manager.resource().executed_objects(), vec![a, b]);
    assert_eq!(manager.transaction().unwrap().applied_count(), 2);
}

#[test]
fn test_flush_without_transaction_is_noop() {
    let mut manager = recording_manager();
    manager.enlistment_mut().mark_updated(obj("Item", 1), attrs!());

    assert!(!manager.flush_transaction());
    assert!(manager.resource().events().is_empty());
    assert!(manager.enlistment().is_dirty(&obj("Item", 1)));
}

#[test]
fn test_update_folds_into_pending_create() {
    // GIVEN
    let mut manager = recording_manager();
    let item = obj("Item", 1);
    manager.start_transaction().unwrap();

    // WHEN
    let created = manager
        .add_command(PersistenceCommand::create(item.clone(), attrs! { "qty" => 1 }))
        .unwrap();
    let updated = manager
        .add_command(PersistenceCommand::update(item.clone(), attrs! { "qty" => 2 }))
        .unwrap();
    manager.end_transaction().unwrap();

    // THEN
    assert!(created);
    assert!(!updated);
    assert_eq!(
        manager.resource().executed(),
        vec![&PersistenceCommand::create(item, attrs! { "qty" => 2 })]
    );
}

#[test]
fn test_latest_update_state_is_committed() {
    // GIVEN
    let mut manager = journal_manager();
    let item = obj("Item", 1);
    manager.start_transaction().unwrap();
    manager
        .enlistment_mut()
        .mark_created(item.clone(), attrs! { "qty" => 1 });
    manager.end_transaction().unwrap();

    // WHEN
    manager.start_transaction().unwrap();
    manager
        .add_command(PersistenceCommand::update(item.clone(), attrs! { "qty" => 1 }))
        .unwrap();
    manager
        .enlistment_mut()
        .mark_updated(item.clone(), attrs! { "qty" => 2 });
    manager.end_transaction().unwrap();

    // THEN
    assert_eq!(
        manager.resource().committed().get(&item).and_then(|s| s.get("qty")),
        Some(&Value::Int(2))
    );
}

#[test]
fn test_updates_kept_when_coalescing_disabled() {
    let config = ManagerConfig::new().with_coalesce_updates(false);
    let mut manager =
        TransactionManager::with_config(RecordingResource::new(), DirtyObjects::new(), config);
    let item = obj("Item", 1);
    manager.start_transaction().unwrap();

    manager
        .add_command(PersistenceCommand::create(item.clone(), attrs!()))
        .unwrap();
    manager
        .add_command(PersistenceCommand::update(item.clone(), attrs!()))
        .unwrap();
    manager.end_transaction().unwrap();

    assert_eq!(manager.resource().executed().len(), 2);
}

#[test]
fn test_update_after_flush_is_not_coalesced() {
    // GIVEN
    let mut manager = recording_manager();
    let item = obj("Item", 1);
    manager.start_transaction().unwrap();
    manager
        .enlistment_mut()
        .mark_created(item.clone(), attrs! { "qty" => 1 });
    manager.flush_transaction();

    // WHEN
    manager
        .enlistment_mut()
        .mark_updated(item.clone(), attrs! { "qty" => 5 });
    manager.end_transaction().unwrap();

    // THEN
    assert_eq!(
        manager.resource().executed(),
        vec![
            &PersistenceCommand::create(item.clone(), attrs! { "qty" => 1 }),
            &PersistenceCommand::update(item, attrs! { "qty" => 5 }),
        ]
    );
}

#[test]
fn test_created_then_deleted_never_reaches_resource() {
    let mut manager = recording_manager();
    let draft = obj("Draft", 1);
    manager.start_transaction().unwrap();

    manager.enlistment_mut().mark_created(draft.clone(), attrs!());
    manager.enlistment_mut().mark_deleted(draft);
    manager.end_transaction().unwrap();

    assert!(manager.resource().executed().is_empty());
    assert_eq!(manager.resource().commits(), 1);
}

#[test]
fn test_flushed_writes_visible_before_commit() {
    // GIVEN
    let mut manager = journal_manager();
    let order = obj("Order", 1);
    manager.start_transaction().unwrap();
    manager
        .enlistment_mut()
        .mark_created(order.clone(), attrs! { "total" => 25 });

    // WHEN
    manager.flush_transaction();

    // THEN
    assert_eq!(
        manager.resource().get(&order).and_then(|s| s.get("total")),
        Some(&Value::Int(25))
    );
    assert!(!manager.resource().committed().contains(&order));

    manager.end_transaction().unwrap();
    assert!(manager.resource().committed().contains(&order));
}
