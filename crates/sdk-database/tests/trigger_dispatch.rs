//! Integration tests for trigger registration and dispatch.
//!
//! Every case registers one trigger under the key being exercised plus a
//! counting trigger under every other `(timing, event)` combination and under
//! the same key on a different table. Only the exercised trigger may run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use sdk_database::{
    ContentValues, DatabaseResult, DbHelper, DelegatingDatabase, TriggerEvent, TriggerKey,
    TriggerMap, TriggerType,
};

const TABLE_NAME: &str = "test";
const OTHER_TABLE_NAME: &str = "other";

fn create_db() -> Arc<DelegatingDatabase> {
    let db = DbHelper::open_in_memory(TriggerMap::new()).unwrap();
    db.execute_batch(
        "CREATE TABLE test (column1 TEXT, column2 INTEGER);
         CREATE TABLE other (column1 TEXT, column2 INTEGER);",
    )
    .unwrap();
    Arc::new(db)
}

fn insert_row(db: &DelegatingDatabase) -> DatabaseResult<i64> {
    let mut values = ContentValues::new();
    values.put("column1", "value".to_string()).put("column2", 1234i64);
    db.insert(TABLE_NAME, &values)
}

fn update_row(db: &DelegatingDatabase) -> DatabaseResult<usize> {
    let mut values = ContentValues::new();
    values.put("column2", 5678i64);
    db.update(TABLE_NAME, &values, Some("column1 = ?"), &[&"value"])
}

fn row_count(db: &DelegatingDatabase) -> i64 {
    db.count(TABLE_NAME, None, &[]).unwrap()
}

fn column2_values(db: &DelegatingDatabase) -> Vec<i64> {
    db.query("SELECT column2 FROM test", [], |row| row.get(0))
        .unwrap()
}

struct Case<S, A, C> {
    trigger_type: TriggerType,
    trigger_event: TriggerEvent,
    setup: S,
    action: A,
    check: C,
}

/// Registers the unrelated counting triggers and the exercised trigger, runs
/// the action and returns `(exercised runs, unrelated runs)`.
fn run_case<S, A, C>(case: Case<S, A, C>) -> (usize, usize)
where
    S: FnOnce(&DelegatingDatabase),
    A: FnOnce(&DelegatingDatabase),
    C: Fn(&DelegatingDatabase) + Send + Sync + 'static,
{
    let db = create_db();
    (case.setup)(&*db);

    let unrelated = Arc::new(AtomicUsize::new(0));
    let unused_keys = TriggerType::ALL
        .iter()
        .flat_map(|t| TriggerEvent::ALL.iter().map(move |e| (*t, *e)))
        .filter(|key| *key != (case.trigger_type, case.trigger_event))
        .map(|(t, e)| TriggerKey::new(TABLE_NAME, t, e))
        .chain(std::iter::once(TriggerKey::new(
            OTHER_TABLE_NAME,
            case.trigger_type,
            case.trigger_event,
        )));
    for key in unused_keys {
        let unrelated = Arc::clone(&unrelated);
        db.register_trigger(&key.table_name, key.trigger_type, key.trigger_event, move || {
            unrelated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let runs = Arc::new(AtomicUsize::new(0));
    let trigger_runs = Arc::clone(&runs);
    let db_ref: Weak<DelegatingDatabase> = Arc::downgrade(&db);
    let check = case.check;
    db.register_trigger(TABLE_NAME, case.trigger_type, case.trigger_event, move || {
        let db = db_ref.upgrade().ok_or("database dropped")?;
        check(&*db);
        trigger_runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    (case.action)(&*db);

    (runs.load(Ordering::SeqCst), unrelated.load(Ordering::SeqCst))
}

#[test]
fn test_before_insert_does_not_see_new_row() {
    let (runs, unrelated) = run_case(Case {
        trigger_type: TriggerType::Before,
        trigger_event: TriggerEvent::Insert,
        setup: |_: &DelegatingDatabase| {},
        action: |db: &DelegatingDatabase| {
            insert_row(db).unwrap();
        },
        check: |db: &DelegatingDatabase| assert_eq!(row_count(db), 0),
    });
    assert_eq!(runs, 1);
    assert_eq!(unrelated, 0);
}

#[test]
fn test_after_insert_sees_new_row() {
    let (runs, unrelated) = run_case(Case {
        trigger_type: TriggerType::After,
        trigger_event: TriggerEvent::Insert,
        setup: |_: &DelegatingDatabase| {},
        action: |db: &DelegatingDatabase| {
            insert_row(db).unwrap();
        },
        check: |db: &DelegatingDatabase| assert_eq!(row_count(db), 1),
    });
    assert_eq!(runs, 1);
    assert_eq!(unrelated, 0);
}

#[test]
fn test_before_delete_still_sees_row() {
    let (runs, unrelated) = run_case(Case {
        trigger_type: TriggerType::Before,
        trigger_event: TriggerEvent::Delete,
        setup: |db: &DelegatingDatabase| {
            insert_row(db).unwrap();
        },
        action: |db: &DelegatingDatabase| {
            db.delete(TABLE_NAME, None, &[]).unwrap();
        },
        check: |db: &DelegatingDatabase| assert_eq!(row_count(db), 1),
    });
    assert_eq!(runs, 1);
    assert_eq!(unrelated, 0);
}

#[test]
fn test_after_delete_sees_row_removed() {
    let (runs, unrelated) = run_case(Case {
        trigger_type: TriggerType::After,
        trigger_event: TriggerEvent::Delete,
        setup: |db: &DelegatingDatabase| {
            insert_row(db).unwrap();
        },
        action: |db: &DelegatingDatabase| {
            db.delete(TABLE_NAME, None, &[]).unwrap();
        },
        check: |db: &DelegatingDatabase| assert_eq!(row_count(db), 0),
    });
    assert_eq!(runs, 1);
    assert_eq!(unrelated, 0);
}

#[test]
fn test_before_update_sees_old_value() {
    let (runs, unrelated) = run_case(Case {
        trigger_type: TriggerType::Before,
        trigger_event: TriggerEvent::Update,
        setup: |db: &DelegatingDatabase| {
            insert_row(db).unwrap();
        },
        action: |db: &DelegatingDatabase| {
            update_row(db).unwrap();
        },
        check: |db: &DelegatingDatabase| assert_eq!(column2_values(db), vec![1234]),
    });
    assert_eq!(runs, 1);
    assert_eq!(unrelated, 0);
}

#[test]
fn test_after_update_sees_new_value() {
    let (runs, unrelated) = run_case(Case {
        trigger_type: TriggerType::After,
        trigger_event: TriggerEvent::Update,
        setup: |db: &DelegatingDatabase| {
            insert_row(db).unwrap();
        },
        action: |db: &DelegatingDatabase| {
            update_row(db).unwrap();
        },
        check: |db: &DelegatingDatabase| assert_eq!(column2_values(db), vec![5678]),
    });
    assert_eq!(runs, 1);
    assert_eq!(unrelated, 0);
}

#[test]
fn test_every_callback_under_a_key_runs_once_per_operation() {
    let db = create_db();
    let counters: Vec<_> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    for counter in &counters {
        let counter = Arc::clone(counter);
        db.register_trigger(TABLE_NAME, TriggerType::After, TriggerEvent::Insert, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    insert_row(&db).unwrap();
    insert_row(&db).unwrap();

    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
