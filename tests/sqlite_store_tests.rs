#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use lesson_schedule::persistence::sqlite::{SqliteEventStore, StoredEvent};
use lesson_schedule::{
    EventPatch, EventStore, EventTimeUpdate, ExternalIdMap, LessonStatus, PersistenceError,
    TimeOfDay, apply_time_updates, compose_utc, updates_for_compact_reorganization,
};

fn t(h: u16, m: u16) -> TimeOfDay {
    TimeOfDay::from_hm(h, m).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
}

fn stored(
    external_id: &str,
    lesson_id: &str,
    start: TimeOfDay,
    duration: u16,
    status: LessonStatus,
) -> StoredEvent {
    StoredEvent {
        external_id: external_id.to_string(),
        lesson_id: lesson_id.to_string(),
        teacher_id: "t-1".to_string(),
        start: compose_utc(day(), start),
        duration_minutes: duration,
        location: None,
        status,
        students: vec!["Maya".to_string()],
    }
}

fn seeded_store() -> SqliteEventStore {
    let store = SqliteEventStore::open_in_memory().unwrap();
    store
        .insert_event(&stored("ev-1", "L1", t(9, 0), 60, LessonStatus::Confirmed))
        .unwrap();
    store
        .insert_event(&stored("ev-2", "L2", t(11, 0), 90, LessonStatus::Confirmed))
        .unwrap();
    store
        .insert_event(&stored("ev-3", "L3", t(14, 0), 60, LessonStatus::Planned))
        .unwrap();
    store
}

#[test]
fn loads_only_committed_events_for_the_day() {
    let store = seeded_store();
    let schedule = store.load_day_schedule("t-1", "Alex", day()).unwrap();

    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule.stored_nodes()[0].event.lesson_id, "L1");
    assert_eq!(schedule.stored_nodes()[1].start, t(11, 0));
    assert_eq!(schedule.stored_nodes()[0].event.student_names, vec!["Maya"]);
}

#[test]
fn update_and_delete_report_missing_rows() {
    let store = seeded_store();
    let patch = EventPatch {
        status: Some(LessonStatus::Cancelled),
        ..EventPatch::default()
    };
    store.update_event("ev-1", &patch).unwrap();
    let row = store.find_event("ev-1").unwrap().unwrap();
    assert_eq!(row.status, LessonStatus::Cancelled);

    match store.update_event("ghost", &patch) {
        Err(PersistenceError::NotFound(id)) => assert_eq!(id, "ghost"),
        other => panic!("expected not found, got {other:?}"),
    }

    store.delete_event("ev-3").unwrap();
    assert!(store.find_event("ev-3").unwrap().is_none());
    assert!(matches!(
        store.delete_event("ev-3"),
        Err(PersistenceError::NotFound(_))
    ));
}

#[test]
fn batch_retiming_is_transactional() {
    let store = seeded_store();
    let good = EventTimeUpdate {
        external_event_id: "ev-1".to_string(),
        new_datetime: compose_utc(day(), t(8, 0)),
    };
    let bad = EventTimeUpdate {
        external_event_id: "ghost".to_string(),
        new_datetime: compose_utc(day(), t(8, 0)),
    };

    let err = store
        .batch_reorganize_event_times(&[good.clone(), bad])
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NotFound(_)));
    // the failed batch rolled back, ev-1 keeps its original time
    let row = store.find_event("ev-1").unwrap().unwrap();
    assert_eq!(row.start, compose_utc(day(), t(9, 0)));

    assert_eq!(store.batch_reorganize_event_times(&[good]).unwrap(), 1);
    let row = store.find_event("ev-1").unwrap().unwrap();
    assert_eq!(row.start, compose_utc(day(), t(8, 0)));
}

#[test]
fn reorganization_diff_flows_into_the_store() {
    let store = seeded_store();
    let mut schedule = store.load_day_schedule("t-1", "Alex", day()).unwrap();
    let ids: ExternalIdMap = [
        ("L1".to_string(), "ev-1".to_string()),
        ("L2".to_string(), "ev-2".to_string()),
    ]
    .into_iter()
    .collect();

    let updates = updates_for_compact_reorganization(&mut schedule, &ids).unwrap();
    let report = apply_time_updates(&store, &updates);
    assert!(report.is_complete());
    assert_eq!(report.updated, 1);

    let row = store.find_event("ev-2").unwrap().unwrap();
    assert_eq!(row.start, compose_utc(day(), t(10, 0)));
    let reloaded = store.load_day_schedule("t-1", "Alex", day()).unwrap();
    assert_eq!(reloaded.stored_nodes()[1].start, t(10, 0));
}
