use crate::calculations::TimedItem;
use crate::records::LessonStatus;
use crate::schedule::DaySchedule;
use crate::timeutil::MINUTES_PER_DAY;
use chrono::{DateTime, Utc};
use std::fmt;

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    ScheduleSnapshot, load_schedule_from_csv, load_schedule_from_json, save_schedule_to_csv,
    save_schedule_to_json,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteEventStore;

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(serde_json::Error),
    Io(std::io::Error),
    Csv(csv::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    InvalidData(String),
    NotFound(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(e) => write!(f, "serialization error: {e}"),
            PersistenceError::Io(e) => write!(f, "io error: {e}"),
            PersistenceError::Csv(e) => write!(f, "csv error: {e}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(e) => write!(f, "sqlite error: {e}"),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            PersistenceError::NotFound(id) => write!(f, "event not found: {id}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e)
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(e: csv::Error) -> Self {
        PersistenceError::Csv(e)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::Sqlite(e)
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A retimed event destined for the external store, keyed by the store's
/// own event id rather than a session-local node id.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTimeUpdate {
    pub external_event_id: String,
    pub new_datetime: DateTime<Utc>,
}

/// Partial update for a single stored event; `None` fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u16>,
    pub status: Option<LessonStatus>,
}

/// Write access to the hosting app's event records.
///
/// The engine never holds the source of truth; every committed
/// reorganization is pushed through this trait as a set of per-event
/// writes.
pub trait EventStore {
    fn update_event(&self, external_id: &str, patch: &EventPatch) -> PersistenceResult<()>;

    fn delete_event(&self, external_id: &str) -> PersistenceResult<()>;

    /// Apply many retimings atomically, returning the number of rows
    /// actually changed.
    fn batch_reorganize_event_times(
        &self,
        updates: &[EventTimeUpdate],
    ) -> PersistenceResult<usize>;
}

#[derive(Debug)]
pub struct BatchFailure {
    pub external_event_id: String,
    pub error: PersistenceError,
}

/// Outcome of pushing a diff to the store: how many writes were attempted,
/// how many landed, and what failed.
#[derive(Debug)]
pub struct BatchReport {
    pub attempted: usize,
    pub updated: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.updated == self.attempted
    }
}

/// Push a set of retimings through the store.
///
/// Tries the batch path first; when the store rejects the batch as a
/// whole, falls back to per-event updates so that one bad row does not
/// block the rest of the diff.
pub fn apply_time_updates<S: EventStore>(store: &S, updates: &[EventTimeUpdate]) -> BatchReport {
    let attempted = updates.len();
    match store.batch_reorganize_event_times(updates) {
        Ok(updated) => BatchReport {
            attempted,
            updated,
            failures: Vec::new(),
        },
        Err(_) => {
            let mut updated = 0;
            let mut failures = Vec::new();
            for update in updates {
                let patch = EventPatch {
                    date: Some(update.new_datetime),
                    ..EventPatch::default()
                };
                match store.update_event(&update.external_event_id, &patch) {
                    Ok(()) => updated += 1,
                    Err(error) => failures.push(BatchFailure {
                        external_event_id: update.external_event_id.clone(),
                        error,
                    }),
                }
            }
            BatchReport {
                attempted,
                updated,
                failures,
            }
        }
    }
}

/// Structural checks run before a schedule is written anywhere: ascending
/// starts, no overlap between adjacent events, everything inside the day.
pub fn validate_schedule(schedule: &DaySchedule) -> PersistenceResult<()> {
    let nodes = schedule.stored_nodes();
    for node in nodes {
        if node.end_minutes() > MINUTES_PER_DAY as i32 {
            return Err(PersistenceError::InvalidData(format!(
                "node {} runs past the end of the day",
                node.id
            )));
        }
    }
    for pair in nodes.windows(2) {
        if pair[1].start < pair[0].start {
            return Err(PersistenceError::InvalidData(
                "events are not in ascending start order".to_string(),
            ));
        }
        if pair[1].start_minutes() < pair[0].end_minutes() {
            return Err(PersistenceError::InvalidData(format!(
                "nodes {} and {} overlap",
                pair[0].id, pair[1].id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EventData;
    use crate::timeutil::TimeOfDay;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    fn t(h: u16, m: u16) -> TimeOfDay {
        TimeOfDay::from_hm(h, m).unwrap()
    }

    #[test]
    fn validation_accepts_a_packed_day() {
        let mut schedule =
            DaySchedule::new("t-1", "Alex", NaiveDate::from_ymd_opt(2025, 7, 14).unwrap());
        schedule
            .add_event(t(9, 0), 60, EventData::new("L1", 1))
            .unwrap();
        schedule
            .add_event(t(10, 0), 90, EventData::new("L2", 2))
            .unwrap();
        assert!(validate_schedule(&schedule).is_ok());
    }

    struct FlakyStore {
        fail_ids: Vec<String>,
        updates_seen: RefCell<Vec<String>>,
    }

    impl EventStore for FlakyStore {
        fn update_event(&self, external_id: &str, _patch: &EventPatch) -> PersistenceResult<()> {
            if self.fail_ids.iter().any(|id| id == external_id) {
                return Err(PersistenceError::NotFound(external_id.to_string()));
            }
            self.updates_seen.borrow_mut().push(external_id.to_string());
            Ok(())
        }

        fn delete_event(&self, external_id: &str) -> PersistenceResult<()> {
            Err(PersistenceError::NotFound(external_id.to_string()))
        }

        fn batch_reorganize_event_times(
            &self,
            _updates: &[EventTimeUpdate],
        ) -> PersistenceResult<usize> {
            Err(PersistenceError::InvalidData("batch unsupported".into()))
        }
    }

    #[test]
    fn batch_fallback_reports_partial_failure() {
        let store = FlakyStore {
            fail_ids: vec!["ev-2".to_string()],
            updates_seen: RefCell::new(Vec::new()),
        };
        let when = NaiveDate::from_ymd_opt(2025, 7, 14)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc();
        let updates = vec![
            EventTimeUpdate {
                external_event_id: "ev-1".to_string(),
                new_datetime: when,
            },
            EventTimeUpdate {
                external_event_id: "ev-2".to_string(),
                new_datetime: when,
            },
        ];

        let report = apply_time_updates(&store, &updates);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].external_event_id, "ev-2");
        assert!(!report.is_complete());
    }
}
