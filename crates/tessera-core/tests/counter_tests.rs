#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{counter_model, new_session};
use tessera_core::errors::{ExErrorKind, SessionError};
use tessera_core::{values, PersistenceAdapter, SlotState, Value};
use uuid::Uuid;

#[test]
fn test_counter_increments_apply_on_save() {
    let (session, adapter) = new_session();
    let model = counter_model();
    let counters = session.model(&model);

    let record = counters.create(Vec::<(String, Value)>::new()).unwrap();
    record.increment("counter", 2).unwrap();
    record.increment("counter", 3).unwrap();
    assert_eq!(record.state("counter").unwrap(), SlotState::Dirty);

    let report = session.save().unwrap();
    assert_eq!(report.rows_written, 1);
    assert_eq!(report.counters_incremented, 1);
    assert!(!record.is_dirty());

    let row = adapter.fetch_one(&model, &record.key()).unwrap().unwrap();
    assert_eq!(row.get("counter"), Some(&Value::Int(5)));
}

#[test]
fn test_counter_delta_survives_load() {
    let (session, _adapter) = new_session();
    let model = counter_model();
    let counters = session.model(&model);

    let record = counters.create(Vec::<(String, Value)>::new()).unwrap();
    record.increment("counter", 10).unwrap();
    session.save().unwrap();
    let key = record.key();
    session.clear();

    // a blind handle cannot read the counter until loaded
    let blind = counters.blind(key.clone()).unwrap();
    blind.increment("counter", 1).unwrap();
    assert!(matches!(
        blind.get("counter"),
        Err(SessionError::AttributeUnavailable { .. })
    ));

    session.refresh(&blind).unwrap();
    assert_eq!(blind.get("counter").unwrap(), Value::Int(11));

    let report = session.save().unwrap();
    assert_eq!(report.rows_written, 0);
    assert_eq!(report.counters_incremented, 1);
    session.clear();

    let reloaded = counters.blind(key).unwrap();
    session.refresh(&reloaded).unwrap();
    assert_eq!(reloaded.get("counter").unwrap(), Value::Int(11));
}

#[test]
fn test_counter_is_not_assignable() {
    let (session, _adapter) = new_session();
    let model = counter_model();
    let counters = session.model(&model);

    let err = counters.create(values! { "counter" => 4i64 }).unwrap_err();
    assert!(matches!(err, SessionError::CounterNotSettable { .. }));

    let record = counters
        .blind(tessera_core::key![Uuid::new_v4(), Uuid::new_v4()])
        .unwrap();
    assert!(matches!(
        record.set("counter", 1i64),
        Err(SessionError::CounterNotSettable { .. })
    ));
    assert!(matches!(
        record.increment("partition", 1),
        Err(SessionError::NotACounter { .. })
    ));
}

#[test]
fn test_counter_overflow_is_reported_not_applied() {
    let (session, adapter) = new_session();
    let model = counter_model();
    let counters = session.model(&model);

    // Given: A counter stored at the top of the i64 range
    let record = counters.create(Vec::<(String, Value)>::new()).unwrap();
    record.increment("counter", i64::MAX).unwrap();
    session.save().unwrap();

    // When: A local increment would overflow the pending delta
    record.increment("counter", 5).unwrap();
    let err = record.increment("counter", i64::MAX).unwrap_err();

    // Then: The increment is refused and the earlier delta is kept
    assert!(matches!(err, SessionError::CounterOverflow { .. }));
    assert_eq!(err.kind(), ExErrorKind::CounterOverflow);

    // And: Saving a delta the stored total cannot absorb fails without writing
    let err = session.save().unwrap_err();
    assert!(err.is_adapter());
    assert_eq!(err.kind(), ExErrorKind::CounterOverflow);
    assert!(record.is_dirty());
    let row = adapter.fetch_one(&model, &record.key()).unwrap().unwrap();
    assert_eq!(row.get("counter"), Some(&Value::Int(i64::MAX)));
}
