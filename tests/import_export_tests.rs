use chrono::NaiveDate;
use lesson_schedule::persistence::{
    load_schedule_from_csv, load_schedule_from_json, save_schedule_to_csv, save_schedule_to_json,
};
use lesson_schedule::{DaySchedule, EventData, PersistenceError, TimeOfDay, validate_schedule};
use tempfile::tempdir;

fn t(h: u16, m: u16) -> TimeOfDay {
    TimeOfDay::from_hm(h, m).unwrap()
}

fn sample_day() -> DaySchedule {
    let mut schedule = DaySchedule::new(
        "t-1",
        "Alex",
        NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
    );
    let mut first = EventData::new("L1", 2);
    first.location = Some("North beach".to_string());
    first.student_names = vec!["Maya".to_string(), "Jon".to_string()];
    schedule.add_event(t(9, 0), 90, first).unwrap();
    schedule
        .add_event(t(11, 30), 60, EventData::new("L2", 1))
        .unwrap();
    schedule
}

#[test]
fn json_round_trip_preserves_the_day() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("day.json");

    let original = sample_day();
    save_schedule_to_json(&original, &path).unwrap();
    let loaded = load_schedule_from_json(&path).unwrap();

    assert_eq!(loaded.teacher_id(), "t-1");
    assert_eq!(loaded.teacher_name(), "Alex");
    assert_eq!(loaded.date(), original.date());
    assert_eq!(loaded.stored_nodes().len(), 2);
    assert_eq!(loaded.stored_nodes()[0].start, t(9, 0));
    assert_eq!(
        loaded.stored_nodes()[0].event.location.as_deref(),
        Some("North beach")
    );
    assert_eq!(
        loaded.stored_nodes()[0].event.student_names,
        vec!["Maya", "Jon"]
    );
    assert!(validate_schedule(&loaded).is_ok());
}

#[test]
fn csv_round_trip_preserves_events_and_metadata() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("day.csv");

    let original = sample_day();
    save_schedule_to_csv(&original, &path).unwrap();
    let loaded = load_schedule_from_csv(&path).unwrap();

    assert_eq!(loaded.teacher_id(), original.teacher_id());
    assert_eq!(loaded.date(), original.date());
    let lessons: Vec<&str> = loaded
        .stored_nodes()
        .iter()
        .map(|n| n.event.lesson_id.as_str())
        .collect();
    assert_eq!(lessons, vec!["L1", "L2"]);
    assert_eq!(loaded.stored_nodes()[1].duration_minutes, 60);
    assert_eq!(loaded.stored_nodes()[0].event.student_count, 2);
}

#[test]
fn loading_a_missing_file_is_an_io_error() {
    let dir = tempdir().expect("create temp dir");
    let missing = dir.path().join("nope.json");
    match load_schedule_from_json(&missing) {
        Err(PersistenceError::Io(_)) => {}
        other => panic!("expected an io error, got {other:?}"),
    }
}

#[test]
fn csv_without_a_schedule_row_is_rejected() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("broken.csv");
    std::fs::write(
        &path,
        "kind,teacher_id,teacher_name,date,lesson_id,start,duration_minutes,location,student_count,students\n\
         event,,,,L1,09:00,60,,1,\n",
    )
    .unwrap();

    match load_schedule_from_csv(&path) {
        Err(PersistenceError::InvalidData(message)) => {
            assert!(message.contains("schedule row"));
        }
        other => panic!("expected invalid data, got {other:?}"),
    }
}
