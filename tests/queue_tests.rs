use chrono::NaiveDate;
use lesson_schedule::{
    Adjustment, DaySchedule, EventData, LessonQueue, QueueError, TimeOfDay, TimedItem,
};

fn t(h: u16, m: u16) -> TimeOfDay {
    TimeOfDay::from_hm(h, m).unwrap()
}

fn day_with(slots: &[(&str, u16, u16, u16)]) -> DaySchedule {
    let mut schedule = DaySchedule::new(
        "t-1",
        "Alex",
        NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
    );
    for &(lesson, h, m, duration) in slots {
        schedule
            .add_event(t(h, m), duration, EventData::new(lesson, 1))
            .unwrap();
    }
    schedule
}

fn add(queue: &mut LessonQueue, schedule: &DaySchedule, id: &str, duration: u16) {
    queue
        .add_lesson(schedule, id, duration, duration, Vec::new(), None)
        .unwrap();
}

#[test]
fn provisional_entries_never_overlap_the_committed_day() {
    let schedule = day_with(&[("C1", 9, 0, 120), ("C2", 12, 0, 60)]);
    let mut queue = LessonQueue::new();
    add(&mut queue, &schedule, "L1", 60);
    add(&mut queue, &schedule, "L2", 90);

    for entry in queue.entries() {
        for node in schedule.stored_nodes() {
            let no_overlap = entry.end_minutes() <= node.start_minutes()
                || entry.start_minutes() >= node.end_minutes();
            assert!(
                no_overlap,
                "{} overlaps committed {}",
                entry.lesson_id, node.event.lesson_id
            );
        }
    }
    assert_eq!(queue.entries()[0].scheduled_start, Some(t(13, 0)));
    assert_eq!(queue.entries()[1].scheduled_start, Some(t(14, 0)));
}

#[test]
fn committed_changes_reflow_the_queue_on_recompute() {
    let mut schedule = day_with(&[("C1", 9, 0, 60)]);
    let mut queue = LessonQueue::new();
    add(&mut queue, &schedule, "L1", 60);
    assert_eq!(queue.entries()[0].scheduled_start, Some(t(10, 0)));

    schedule
        .add_event(t(10, 0), 90, EventData::new("C2", 2))
        .unwrap();
    queue.recompute(&schedule).unwrap();
    assert_eq!(queue.entries()[0].scheduled_start, Some(t(11, 30)));
}

#[test]
fn nudges_are_tracked_as_tagged_adjustments() {
    let schedule = day_with(&[]);
    let mut queue = LessonQueue::new();
    add(&mut queue, &schedule, "L1", 60);
    add(&mut queue, &schedule, "L2", 60);

    queue.adjust_start_time(&schedule, "L2", 45).unwrap();
    assert_eq!(
        queue.find("L2").unwrap().adjustments(),
        vec![Adjustment::Manual(45)]
    );

    let closed = queue.remove_gap_for_lesson(&schedule, "L2").unwrap();
    assert_eq!(closed, 45);
    assert_eq!(
        queue.find("L2").unwrap().adjustments(),
        vec![Adjustment::Manual(45), Adjustment::AutoGapClosure(-45)]
    );
    assert_eq!(queue.entries()[1].scheduled_start, Some(t(10, 0)));
}

#[test]
fn reordering_keeps_the_layout_packed() {
    let schedule = day_with(&[]);
    let mut queue = LessonQueue::new();
    add(&mut queue, &schedule, "L1", 45);
    add(&mut queue, &schedule, "L2", 90);
    add(&mut queue, &schedule, "L3", 30);

    queue.move_down(&schedule, "L1").unwrap();
    let order: Vec<&str> = queue.entries().iter().map(|e| e.lesson_id.as_str()).collect();
    assert_eq!(order, vec!["L2", "L1", "L3"]);

    let starts: Vec<Option<TimeOfDay>> =
        queue.entries().iter().map(|e| e.scheduled_start).collect();
    assert_eq!(
        starts,
        vec![Some(t(9, 0)), Some(t(10, 30)), Some(t(11, 15))]
    );
    assert!(queue.entries().iter().all(|e| !e.has_gap));
}

#[test]
fn global_offset_follows_the_first_entry() {
    let schedule = day_with(&[]);
    let mut queue = LessonQueue::new();
    add(&mut queue, &schedule, "L1", 60);
    add(&mut queue, &schedule, "L2", 60);
    assert_eq!(queue.global_offset_minutes(), 0);

    queue.adjust_start_time(&schedule, "L1", 60).unwrap();
    assert_eq!(queue.global_offset_minutes(), 60);
    assert_eq!(queue.entries()[0].scheduled_start, Some(t(10, 0)));
    assert_eq!(queue.entries()[1].scheduled_start, Some(t(11, 0)));
}

#[test]
fn removing_an_entry_closes_the_hole_it_left() {
    let schedule = day_with(&[]);
    let mut queue = LessonQueue::new();
    add(&mut queue, &schedule, "L1", 60);
    add(&mut queue, &schedule, "L2", 30);
    add(&mut queue, &schedule, "L3", 60);

    let removed = queue.remove_lesson(&schedule, "L2").unwrap();
    assert_eq!(removed.lesson_id, "L2");
    assert_eq!(queue.entries()[1].scheduled_start, Some(t(10, 0)));
    assert_eq!(
        queue.remove_lesson(&schedule, "L2"),
        Err(QueueError::UnknownLesson("L2".to_string()))
    );
}
