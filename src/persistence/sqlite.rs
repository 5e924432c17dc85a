//! SQLite-backed event store.
//!
//! Events are stored one row per scheduled occurrence, keyed by the
//! external event id. The engine reads a teacher's day out of this table
//! and writes reorganization diffs back through the [`EventStore`] trait.

use super::{EventPatch, EventStore, EventTimeUpdate, PersistenceError, PersistenceResult};
use crate::node::EventData;
use crate::records::LessonStatus;
use crate::schedule::DaySchedule;
use crate::timeutil::TimeOfDay;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

/// A stored event row, as inserted by the hosting app or a seed.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub external_id: String,
    pub lesson_id: String,
    pub teacher_id: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: u16,
    pub location: Option<String>,
    pub status: LessonStatus,
    pub students: Vec<String>,
}

pub struct SqliteEventStore {
    connection: Mutex<Connection>,
}

impl SqliteEventStore {
    pub fn open<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> PersistenceResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                external_id      TEXT PRIMARY KEY,
                lesson_id        TEXT NOT NULL,
                teacher_id       TEXT NOT NULL,
                start_utc        TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                location         TEXT,
                status           TEXT NOT NULL,
                students_json    TEXT NOT NULL DEFAULT '[]'
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<std::sync::MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("connection mutex poisoned".to_string()))
    }

    pub fn insert_event(&self, event: &StoredEvent) -> PersistenceResult<()> {
        let conn = self.lock()?;
        let students = serde_json::to_string(&event.students)?;
        conn.execute(
            "INSERT INTO events
                (external_id, lesson_id, teacher_id, start_utc, duration_minutes,
                 location, status, students_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.external_id,
                event.lesson_id,
                event.teacher_id,
                event.start.to_rfc3339(),
                event.duration_minutes,
                event.location,
                event.status.as_str(),
                students,
            ],
        )?;
        Ok(())
    }

    pub fn find_event(&self, external_id: &str) -> PersistenceResult<Option<StoredEvent>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT external_id, lesson_id, teacher_id, start_utc, duration_minutes,
                    location, status, students_json
             FROM events WHERE external_id = ?1",
            params![external_id],
            row_to_event,
        )
        .optional()?
        .transpose()
    }

    /// Build a teacher's committed day out of the stored rows.
    ///
    /// Only confirmed and completed events inside the UTC day take part;
    /// planned and cancelled rows are left to the queue and the diff layer.
    pub fn load_day_schedule(
        &self,
        teacher_id: &str,
        teacher_name: &str,
        date: NaiveDate,
    ) -> PersistenceResult<DaySchedule> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT external_id, lesson_id, teacher_id, start_utc, duration_minutes,
                        location, status, students_json
                 FROM events
                 WHERE teacher_id = ?1 AND start_utc LIKE ?2
                 ORDER BY start_utc",
            )?;
            let day_prefix = format!("{}%", date.format("%Y-%m-%d"));
            let mapped = stmt.query_map(params![teacher_id, day_prefix], row_to_event)?;
            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row??);
            }
            rows
        };

        let mut schedule = DaySchedule::new(teacher_id, teacher_name, date);
        for event in rows {
            if !event.status.is_committed() {
                continue;
            }
            let mut data = EventData::new(&event.lesson_id, event.students.len() as u16);
            data.location = event.location.clone();
            data.student_names = event.students.clone();
            schedule
                .add_event(
                    TimeOfDay::from_datetime(&event.start),
                    event.duration_minutes,
                    data,
                )
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
        }
        Ok(schedule)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<PersistenceResult<StoredEvent>> {
    let external_id: String = row.get(0)?;
    let lesson_id: String = row.get(1)?;
    let teacher_id: String = row.get(2)?;
    let start_raw: String = row.get(3)?;
    let duration_minutes: u16 = row.get(4)?;
    let location: Option<String> = row.get(5)?;
    let status_raw: String = row.get(6)?;
    let students_raw: String = row.get(7)?;

    Ok((|| {
        let start = DateTime::parse_from_rfc3339(&start_raw)
            .map_err(|_| {
                PersistenceError::InvalidData(format!("unparseable datetime '{start_raw}'"))
            })?
            .with_timezone(&Utc);
        let status = LessonStatus::from_str(&status_raw).ok_or_else(|| {
            PersistenceError::InvalidData(format!("unknown status '{status_raw}'"))
        })?;
        let students: Vec<String> = serde_json::from_str(&students_raw)?;
        Ok(StoredEvent {
            external_id,
            lesson_id,
            teacher_id,
            start,
            duration_minutes,
            location,
            status,
            students,
        })
    })())
}

impl EventStore for SqliteEventStore {
    fn update_event(&self, external_id: &str, patch: &EventPatch) -> PersistenceResult<()> {
        let conn = self.lock()?;
        let mut changed = 0;
        if let Some(date) = patch.date {
            changed += conn.execute(
                "UPDATE events SET start_utc = ?1 WHERE external_id = ?2",
                params![date.to_rfc3339(), external_id],
            )?;
        }
        if let Some(duration) = patch.duration_minutes {
            changed += conn.execute(
                "UPDATE events SET duration_minutes = ?1 WHERE external_id = ?2",
                params![duration, external_id],
            )?;
        }
        if let Some(status) = patch.status {
            changed += conn.execute(
                "UPDATE events SET status = ?1 WHERE external_id = ?2",
                params![status.as_str(), external_id],
            )?;
        }
        if changed == 0 {
            return Err(PersistenceError::NotFound(external_id.to_string()));
        }
        Ok(())
    }

    fn delete_event(&self, external_id: &str) -> PersistenceResult<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM events WHERE external_id = ?1",
            params![external_id],
        )?;
        if deleted == 0 {
            return Err(PersistenceError::NotFound(external_id.to_string()));
        }
        Ok(())
    }

    fn batch_reorganize_event_times(
        &self,
        updates: &[EventTimeUpdate],
    ) -> PersistenceResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut updated = 0;
        for update in updates {
            let changed = tx.execute(
                "UPDATE events SET start_utc = ?1 WHERE external_id = ?2",
                params![update.new_datetime.to_rfc3339(), update.external_event_id],
            )?;
            if changed == 0 {
                return Err(PersistenceError::NotFound(
                    update.external_event_id.clone(),
                ));
            }
            updated += changed;
        }
        tx.commit()?;
        Ok(updated)
    }
}
