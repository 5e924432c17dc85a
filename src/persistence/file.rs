//! JSON and CSV snapshots of a day schedule.
//!
//! JSON stores a [`ScheduleSnapshot`] verbatim. CSV is row-oriented: one
//! leading `schedule` row carries the day-level fields, followed by one
//! `event` row per node. Node ids are session-local and are reassigned on
//! load.

use super::{PersistenceError, PersistenceResult};
use crate::node::{EventData, ScheduleNode};
use crate::schedule::DaySchedule;
use crate::timeutil::TimeOfDay;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serializable image of a [`DaySchedule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub teacher_id: String,
    pub teacher_name: String,
    pub date: NaiveDate,
    pub nodes: Vec<ScheduleNode>,
}

impl From<&DaySchedule> for ScheduleSnapshot {
    fn from(schedule: &DaySchedule) -> Self {
        Self {
            teacher_id: schedule.teacher_id().to_string(),
            teacher_name: schedule.teacher_name().to_string(),
            date: schedule.date(),
            nodes: schedule.stored_nodes().to_vec(),
        }
    }
}

impl ScheduleSnapshot {
    pub fn into_schedule(self) -> PersistenceResult<DaySchedule> {
        let mut schedule = DaySchedule::new(self.teacher_id, self.teacher_name, self.date);
        for node in self.nodes {
            schedule
                .add_event(node.start, node.duration_minutes, node.event)
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
        }
        Ok(schedule)
    }
}

pub fn save_schedule_to_json<P: AsRef<Path>>(
    schedule: &DaySchedule,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = ScheduleSnapshot::from(schedule);
    let json = serde_json::to_string_pretty(&snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_schedule_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<DaySchedule> {
    let json = fs::read_to_string(path)?;
    let snapshot: ScheduleSnapshot = serde_json::from_str(&json)?;
    snapshot.into_schedule()
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    kind: String,
    teacher_id: String,
    teacher_name: String,
    date: String,
    lesson_id: String,
    start: String,
    duration_minutes: u16,
    location: String,
    student_count: u16,
    students: String,
}

impl CsvRow {
    fn schedule_row(schedule: &DaySchedule) -> Self {
        Self {
            kind: "schedule".to_string(),
            teacher_id: schedule.teacher_id().to_string(),
            teacher_name: schedule.teacher_name().to_string(),
            date: schedule.date().format("%Y-%m-%d").to_string(),
            lesson_id: String::new(),
            start: String::new(),
            duration_minutes: 0,
            location: String::new(),
            student_count: 0,
            students: String::new(),
        }
    }

    fn event_row(node: &ScheduleNode) -> Self {
        Self {
            kind: "event".to_string(),
            teacher_id: String::new(),
            teacher_name: String::new(),
            date: String::new(),
            lesson_id: node.event.lesson_id.clone(),
            start: node.start.to_string(),
            duration_minutes: node.duration_minutes,
            location: node.event.location.clone().unwrap_or_default(),
            student_count: node.event.student_count,
            students: node.event.student_names.join(";"),
        }
    }
}

pub fn save_schedule_to_csv<P: AsRef<Path>>(
    schedule: &DaySchedule,
    path: P,
) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.serialize(CsvRow::schedule_row(schedule))?;
    for node in schedule.stored_nodes() {
        writer.serialize(CsvRow::event_row(node))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_schedule_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<DaySchedule> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut schedule: Option<DaySchedule> = None;

    for row in reader.deserialize() {
        let row: CsvRow = row?;
        match row.kind.as_str() {
            "schedule" => {
                let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|_| {
                    PersistenceError::InvalidData(format!("unparseable date '{}'", row.date))
                })?;
                schedule = Some(DaySchedule::new(row.teacher_id, row.teacher_name, date));
            }
            "event" => {
                let schedule = schedule.as_mut().ok_or_else(|| {
                    PersistenceError::InvalidData(
                        "event row before the schedule row".to_string(),
                    )
                })?;
                let start: TimeOfDay = row.start.parse().map_err(|_| {
                    PersistenceError::InvalidData(format!("unparseable time '{}'", row.start))
                })?;
                let mut event = EventData::new(row.lesson_id, row.student_count);
                if !row.location.is_empty() {
                    event.location = Some(row.location);
                }
                if !row.students.is_empty() {
                    event.student_names = row.students.split(';').map(str::to_string).collect();
                }
                schedule
                    .add_event(start, row.duration_minutes, event)
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
            }
            other => {
                return Err(PersistenceError::InvalidData(format!(
                    "unknown row kind '{other}'"
                )));
            }
        }
    }

    schedule.ok_or_else(|| PersistenceError::InvalidData("no schedule row found".to_string()))
}
