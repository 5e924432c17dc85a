use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a lesson event in the hosting app's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Planned,
    Confirmed,
    Completed,
    Cancelled,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Planned => "planned",
            LessonStatus::Confirmed => "confirmed",
            LessonStatus::Completed => "completed",
            LessonStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(LessonStatus::Planned),
            "confirmed" => Some(LessonStatus::Confirmed),
            "completed" => Some(LessonStatus::Completed),
            "cancelled" => Some(LessonStatus::Cancelled),
            _ => None,
        }
    }

    /// Confirmed and completed events occupy the committed day schedule;
    /// planned ones are staged through the queue instead.
    pub fn is_committed(&self) -> bool {
        matches!(self, LessonStatus::Confirmed | LessonStatus::Completed)
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled occurrence of a lesson, as stored externally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonEvent {
    pub date: DateTime<Utc>,
    pub duration_minutes: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: LessonStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentBooking {
    #[serde(default)]
    pub students: Vec<String>,
}

/// A lesson row from the hosting app: identity, assigned teacher, its
/// scheduled events and the booking behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub id: String,
    pub teacher: String,
    #[serde(default)]
    pub events: Vec<LessonEvent>,
    #[serde(default)]
    pub booking: StudentBooking,
}

impl LessonRecord {
    pub fn new(id: impl Into<String>, teacher: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            teacher: teacher.into(),
            events: Vec::new(),
            booking: StudentBooking::default(),
        }
    }
}
