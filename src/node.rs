use crate::calculations::TimedItem;
use crate::timeutil::TimeOfDay;
use serde::{Deserialize, Serialize};

/// Lesson details carried by a committed time block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub lesson_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub student_count: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub student_names: Vec<String>,
}

impl EventData {
    pub fn new(lesson_id: impl Into<String>, student_count: u16) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            location: None,
            student_count,
            student_names: Vec::new(),
        }
    }
}

/// A committed time block on a teacher's day.
///
/// Nodes live inside a [`crate::DaySchedule`], which keeps them sorted by
/// start time; ids are assigned by the schedule and are stable across
/// reorganizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleNode {
    pub id: u32,
    pub start: TimeOfDay,
    pub duration_minutes: u16,
    pub event: EventData,
}

impl ScheduleNode {
    pub fn end_minutes(&self) -> i32 {
        self.start.minutes() as i32 + self.duration_minutes as i32
    }
}

impl TimedItem for ScheduleNode {
    fn start_minutes(&self) -> i32 {
        self.start.minutes() as i32
    }

    fn duration_minutes(&self) -> i32 {
        self.duration_minutes as i32
    }
}

/// One entry of the gap-annotated day view.
///
/// Gaps are synthesized on demand between chronologically adjacent events;
/// they are never stored and cannot be targeted by insert/remove.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEntry {
    Event(ScheduleNode),
    Gap {
        start: TimeOfDay,
        duration_minutes: u16,
    },
}

impl TimelineEntry {
    pub fn is_gap(&self) -> bool {
        matches!(self, TimelineEntry::Gap { .. })
    }
}
