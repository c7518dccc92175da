#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{new_session, no_default_todo_model};
use tessera_core::errors::ExErrorKind;
use tessera_core::{values, Record, SlotState, Value};
use uuid::Uuid;

/// Records keyed by ascending uuids, so save order is creation order
fn create_ordered(session: &tessera_core::Session, n: usize) -> Vec<Record> {
    let todo_model = no_default_todo_model();
    let mut ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
    ids.sort();
    ids.into_iter()
        .enumerate()
        .map(|(i, id)| {
            session
                .model(&todo_model)
                .create(values! { "uuid" => id, "title" => format!("todo {}", i) })
                .unwrap()
        })
        .collect()
}

#[test]
fn test_partial_save_keeps_earlier_writes_committed() {
    let (session, adapter) = new_session();
    let records = create_ordered(&session, 3);

    // GIVEN the adapter accepts one write and fails the next
    adapter.fail_writes_after(1, 1);

    // WHEN saving
    let err = session.save().unwrap_err();
    assert!(err.is_adapter());
    assert_eq!(err.kind(), ExErrorKind::Persistence);

    // THEN the first instance is committed, the failing and unattempted ones stay dirty
    assert_eq!(records[0].state("title").unwrap(), SlotState::Loaded);
    assert_eq!(records[1].state("title").unwrap(), SlotState::Dirty);
    assert_eq!(records[2].state("title").unwrap(), SlotState::Dirty);
    assert_eq!(session.dirty_count(), 2);
    assert_eq!(adapter.row_count("no_default_todo"), 1);

    // AND a retry completes the remainder
    let report = session.save().unwrap();
    assert_eq!(report.rows_written, 2);
    assert_eq!(session.dirty_count(), 0);
    assert_eq!(adapter.row_count("no_default_todo"), 3);
}

#[test]
fn test_failed_save_preserves_dirty_values() {
    let (session, adapter) = new_session();
    let records = create_ordered(&session, 1);
    session.save().unwrap();

    records[0].set("title", "edited").unwrap();
    adapter.fail_next_writes(1);
    assert!(session.save().is_err());

    assert_eq!(records[0].get("title").unwrap(), Value::from("edited"));
    assert_eq!(records[0].state("title").unwrap(), SlotState::Dirty);
    let stored = adapter.rows("no_default_todo");
    assert_eq!(stored[0].get("title"), Some(&Value::from("todo 0")));

    session.save().unwrap();
    let stored = adapter.rows("no_default_todo");
    assert_eq!(stored[0].get("title"), Some(&Value::from("edited")));
}

#[test]
fn test_edit_after_save_is_a_new_pending_change() {
    let (session, _adapter) = new_session();
    let records = create_ordered(&session, 1);
    session.save().unwrap();

    // an assignment after a successful save is a new pending change
    records[0].set("title", "again").unwrap();
    assert!(records[0].is_dirty());
    let report = session.save().unwrap();
    assert_eq!(report.rows_written, 1);
    assert!(!records[0].is_dirty());
}
