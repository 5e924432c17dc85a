use crate::calculations::{TimedItem, find_next_available_slot};
use crate::node::{EventData, ScheduleNode, TimelineEntry};
use crate::records::LessonRecord;
use crate::timeutil::{MINUTES_PER_DAY, TimeOfDay};
use chrono::{Duration, NaiveDate};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    NodeNotFound { node_id: u32 },
    OutOfDay { minutes: i32 },
    NotEnoughEvents,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::NodeNotFound { node_id } => {
                write!(f, "schedule node {node_id} not found")
            }
            ScheduleError::OutOfDay { minutes } => write!(
                f,
                "time {minutes} minutes falls outside the day (0..{MINUTES_PER_DAY})"
            ),
            ScheduleError::NotEnoughEvents => {
                write!(f, "operation requires more events than the schedule holds")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// A conflict found while probing a candidate slot.
///
/// The suggestion is always the next free slot after the last existing
/// event, never an interior gap.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotConflict {
    pub node_id: u32,
    pub suggested_start: Option<TimeOfDay>,
}

/// One teacher's committed day: an ordered set of time blocks.
///
/// Events are held in a vector kept strictly ascending by start time.
/// The schedule itself is a per-session view; the backing truth lives in an
/// external event store and is rebuilt through
/// [`DaySchedule::from_lesson_records`] or a persistence loader.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    teacher_id: String,
    teacher_name: String,
    date: NaiveDate,
    nodes: Vec<ScheduleNode>,
    next_node_id: u32,
}

impl DaySchedule {
    pub fn new(
        teacher_id: impl Into<String>,
        teacher_name: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            teacher_name: teacher_name.into(),
            date,
            nodes: Vec::new(),
            next_node_id: 1,
        }
    }

    /// Rebuild a day from the hosting app's lesson rows.
    ///
    /// Keeps only events assigned to `teacher_id` that fall inside the UTC
    /// day and carry a committed status; clock times are derived from the
    /// stored UTC datetimes.
    pub fn from_lesson_records(
        teacher_id: impl Into<String>,
        teacher_name: impl Into<String>,
        date: NaiveDate,
        records: &[LessonRecord],
    ) -> Result<Self, ScheduleError> {
        let mut schedule = Self::new(teacher_id, teacher_name, date);
        let day_start = date
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists")
            .and_utc();
        let day_end = day_start + Duration::days(1);

        for record in records {
            if record.teacher != schedule.teacher_id {
                continue;
            }
            for event in &record.events {
                if event.date < day_start || event.date >= day_end {
                    continue;
                }
                if !event.status.is_committed() {
                    continue;
                }
                let mut data = EventData::new(&record.id, record.booking.students.len() as u16);
                data.location = event.location.clone();
                data.student_names = record.booking.students.clone();
                schedule.add_event(
                    TimeOfDay::from_datetime(&event.date),
                    event.duration_minutes,
                    data,
                )?;
            }
        }
        Ok(schedule)
    }

    pub fn teacher_id(&self) -> &str {
        &self.teacher_id
    }

    pub fn teacher_name(&self) -> &str {
        &self.teacher_name
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert an event at its sorted position and return the created node.
    ///
    /// Overlap against existing nodes is the caller's concern (probe with
    /// [`DaySchedule::check_conflict`] first); only day-boundary violations
    /// are rejected here.
    pub fn add_event(
        &mut self,
        start: TimeOfDay,
        duration_minutes: u16,
        event: EventData,
    ) -> Result<&ScheduleNode, ScheduleError> {
        let end = start.minutes() as i32 + duration_minutes as i32;
        if end > MINUTES_PER_DAY as i32 {
            return Err(ScheduleError::OutOfDay { minutes: end });
        }
        let node = ScheduleNode {
            id: self.next_node_id,
            start,
            duration_minutes,
            event,
        };
        self.next_node_id += 1;
        let at = self
            .nodes
            .partition_point(|n| (n.start, n.id) <= (node.start, node.id));
        self.nodes.insert(at, node);
        Ok(&self.nodes[at])
    }

    /// Unlink a node by id, returning it.
    pub fn remove_node(&mut self, node_id: u32) -> Result<ScheduleNode, ScheduleError> {
        match self.nodes.iter().position(|n| n.id == node_id) {
            Some(idx) => Ok(self.nodes.remove(idx)),
            None => Err(ScheduleError::NodeNotFound { node_id }),
        }
    }

    /// Real events only, ascending by start time.
    pub fn stored_nodes(&self) -> &[ScheduleNode] {
        &self.nodes
    }

    pub fn find_node(&self, node_id: u32) -> Option<&ScheduleNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Stored events interleaved with synthesized gap entries.
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        let mut entries = Vec::with_capacity(self.nodes.len() * 2);
        for (idx, node) in self.nodes.iter().enumerate() {
            entries.push(TimelineEntry::Event(node.clone()));
            if let Some(next) = self.nodes.get(idx + 1) {
                let idle = next.start.minutes() as i32 - node.end_minutes();
                if idle > 0 {
                    let start = TimeOfDay::from_minutes(node.end_minutes() as u16)
                        .expect("gap start stays inside the day");
                    entries.push(TimelineEntry::Gap {
                        start,
                        duration_minutes: idle as u16,
                    });
                }
            }
        }
        entries
    }

    /// Probe a candidate slot against every stored event.
    ///
    /// Returns the first conflicting node together with a suggested
    /// alternative after the last event, or `None` when the slot is free.
    pub fn check_conflict(&self, start: TimeOfDay, duration_minutes: u16) -> Option<SlotConflict> {
        let candidate_start = start.minutes() as i32;
        let candidate_end = candidate_start + duration_minutes as i32;
        let conflicting = self.nodes.iter().find(|node| {
            candidate_start < node.end_minutes() && candidate_end > node.start_minutes()
        })?;
        let suggested =
            find_next_available_slot(&self.nodes, duration_minutes as i32, candidate_start);
        Some(SlotConflict {
            node_id: conflicting.id,
            suggested_start: u16::try_from(suggested)
                .ok()
                .and_then(TimeOfDay::from_minutes)
                .filter(|s| s.minutes() as i32 + duration_minutes as i32 <= MINUTES_PER_DAY as i32),
        })
    }

    /// The slot a new event of `duration_minutes` would be appended at:
    /// after the last event, or `default_start` when the day is empty.
    pub fn possible_slot(
        &self,
        duration_minutes: u16,
        default_start: TimeOfDay,
    ) -> Option<TimeOfDay> {
        let start = find_next_available_slot(
            &self.nodes,
            duration_minutes as i32,
            default_start.minutes() as i32,
        );
        let slot = u16::try_from(start).ok().and_then(TimeOfDay::from_minutes)?;
        if slot.minutes() as i32 + duration_minutes as i32 <= MINUTES_PER_DAY as i32 {
            Some(slot)
        } else {
            None
        }
    }

    /// End of the last event in minutes, if any event exists.
    pub fn last_end_minutes(&self) -> Option<i32> {
        self.nodes.iter().map(ScheduleNode::end_minutes).max()
    }

    /// Reposition every node to the given start minutes in one step.
    ///
    /// Validates the whole assignment before mutating anything, so a failed
    /// call leaves the schedule untouched. `starts` must be aligned with
    /// the current stored order.
    pub(crate) fn apply_starts(&mut self, starts: &[i32]) -> Result<(), ScheduleError> {
        debug_assert_eq!(starts.len(), self.nodes.len());
        let mut resolved = Vec::with_capacity(starts.len());
        for (node, &start) in self.nodes.iter().zip(starts) {
            let end = start + node.duration_minutes as i32;
            let time = u16::try_from(start)
                .ok()
                .and_then(TimeOfDay::from_minutes)
                .filter(|_| end <= MINUTES_PER_DAY as i32)
                .ok_or(ScheduleError::OutOfDay { minutes: start })?;
            resolved.push(time);
        }
        for (node, time) in self.nodes.iter_mut().zip(resolved) {
            node.start = time;
        }
        self.sort_nodes();
        Ok(())
    }

    pub(crate) fn set_node_start(
        &mut self,
        node_id: u32,
        start: TimeOfDay,
    ) -> Result<(), ScheduleError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or(ScheduleError::NodeNotFound { node_id })?;
        let end = start.minutes() as i32 + node.duration_minutes as i32;
        if end > MINUTES_PER_DAY as i32 {
            return Err(ScheduleError::OutOfDay { minutes: end });
        }
        node.start = start;
        self.sort_nodes();
        Ok(())
    }

    fn sort_nodes(&mut self) {
        self.nodes.sort_by_key(|n| (n.start, n.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u16, m: u16) -> TimeOfDay {
        TimeOfDay::from_hm(h, m).unwrap()
    }

    fn sample_schedule() -> DaySchedule {
        DaySchedule::new("t-1", "Alex", NaiveDate::from_ymd_opt(2025, 7, 14).unwrap())
    }

    #[test]
    fn add_event_keeps_nodes_sorted() {
        let mut schedule = sample_schedule();
        schedule
            .add_event(t(10, 0), 120, EventData::new("L1", 2))
            .unwrap();
        schedule
            .add_event(t(9, 0), 60, EventData::new("L2", 1))
            .unwrap();

        let lessons: Vec<&str> = schedule
            .stored_nodes()
            .iter()
            .map(|n| n.event.lesson_id.as_str())
            .collect();
        assert_eq!(lessons, vec!["L2", "L1"]);
    }

    #[test]
    fn remove_unknown_node_is_an_explicit_error() {
        let mut schedule = sample_schedule();
        assert_eq!(
            schedule.remove_node(99),
            Err(ScheduleError::NodeNotFound { node_id: 99 })
        );
    }

    #[test]
    fn conflict_probe_suggests_slot_after_last_event() {
        let mut schedule = sample_schedule();
        schedule
            .add_event(t(9, 0), 60, EventData::new("L1", 1))
            .unwrap();
        schedule
            .add_event(t(11, 0), 90, EventData::new("L2", 1))
            .unwrap();

        let conflict = schedule.check_conflict(t(9, 30), 60).unwrap();
        assert_eq!(conflict.suggested_start, Some(t(12, 30)));
        assert!(schedule.check_conflict(t(10, 0), 60).is_none());
    }

    #[test]
    fn add_event_rejects_spill_past_midnight() {
        let mut schedule = sample_schedule();
        let err = schedule
            .add_event(t(23, 30), 60, EventData::new("L1", 1))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::OutOfDay { .. }));
    }
}
