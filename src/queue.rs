//! Provisional staging area for planned lessons.
//!
//! Queue entries are not part of the committed day; they are laid out
//! around it. Every mutation triggers a full recompute of the provisional
//! start times, so entry state is always consistent with the committed
//! schedule the queue was last computed against.

use crate::calculations::{TimedItem, compact_starts_preserving_order, find_next_available_slot};
use crate::records::LessonStatus;
use crate::schedule::DaySchedule;
use crate::timeutil::{MINUTES_PER_DAY, TimeOfDay};
use serde::Serialize;
use std::fmt;

/// Queue layout begins here when no preferred start is set and the
/// committed day is empty.
pub const DEFAULT_QUEUE_START: u16 = 9 * 60;

/// Step used when probing whether an entry could move earlier.
pub const EARLIER_MOVE_STEP_MINUTES: i32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    AlreadyQueued(String),
    NotPlannable(LessonStatus),
    UnknownLesson(String),
    OutOfDay(i32),
    NothingToSwap,
    NoPredecessor,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::AlreadyQueued(id) => write!(f, "lesson {id} is already queued"),
            QueueError::NotPlannable(status) => {
                write!(f, "only planned lessons can be queued, got status {status}")
            }
            QueueError::UnknownLesson(id) => write!(f, "lesson {id} is not in the queue"),
            QueueError::OutOfDay(minutes) => {
                write!(f, "queue layout reaches minute {minutes}, past the end of the day")
            }
            QueueError::NothingToSwap => write!(f, "entry is already at that edge of the queue"),
            QueueError::NoPredecessor => write!(f, "entry has no predecessor to close a gap with"),
        }
    }
}

impl std::error::Error for QueueError {}

/// A user-visible or automatic retiming applied to one queue entry,
/// relative to the point the layout cursor would otherwise place it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "minutes", rename_all = "snake_case")]
pub enum Adjustment {
    Manual(i32),
    AutoGapClosure(i32),
}

/// One planned lesson waiting for a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedLesson {
    pub lesson_id: String,
    pub duration_minutes: u16,
    pub remaining_minutes: u16,
    pub students: Vec<String>,
    manual_minutes: i32,
    gap_closure_minutes: i32,
    pub scheduled_start: Option<TimeOfDay>,
    pub has_gap: bool,
}

impl QueuedLesson {
    /// Non-zero adjustments, in the order the layout applies them.
    pub fn adjustments(&self) -> Vec<Adjustment> {
        let mut out = Vec::with_capacity(2);
        if self.manual_minutes != 0 {
            out.push(Adjustment::Manual(self.manual_minutes));
        }
        if self.gap_closure_minutes != 0 {
            out.push(Adjustment::AutoGapClosure(self.gap_closure_minutes));
        }
        out
    }

    fn offset_minutes(&self) -> i32 {
        self.manual_minutes + self.gap_closure_minutes
    }
}

impl TimedItem for QueuedLesson {
    fn start_minutes(&self) -> i32 {
        self.scheduled_start.map(|s| s.minutes() as i32).unwrap_or(0)
    }

    fn duration_minutes(&self) -> i32 {
        self.duration_minutes as i32
    }
}

/// Ordered queue of planned lessons for one teacher's day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonQueue {
    preferred_start: Option<TimeOfDay>,
    entries: Vec<QueuedLesson>,
}

impl LessonQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[QueuedLesson] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn preferred_start(&self) -> Option<TimeOfDay> {
        self.preferred_start
    }

    pub fn find(&self, lesson_id: &str) -> Option<&QueuedLesson> {
        self.entries.iter().find(|e| e.lesson_id == lesson_id)
    }

    fn index_of(&self, lesson_id: &str) -> Result<usize, QueueError> {
        self.entries
            .iter()
            .position(|e| e.lesson_id == lesson_id)
            .ok_or_else(|| QueueError::UnknownLesson(lesson_id.to_string()))
    }

    /// Append a planned lesson and lay the queue out again.
    ///
    /// `status` is the lesson's current store status when known; anything
    /// other than planned is rejected. The initial duration is clamped to
    /// the lesson's remaining entitlement.
    pub fn add_lesson(
        &mut self,
        schedule: &DaySchedule,
        lesson_id: impl Into<String>,
        duration_minutes: u16,
        remaining_minutes: u16,
        students: Vec<String>,
        status: Option<LessonStatus>,
    ) -> Result<(), QueueError> {
        if let Some(status) = status {
            if status != LessonStatus::Planned {
                return Err(QueueError::NotPlannable(status));
            }
        }
        let lesson_id = lesson_id.into();
        if self.find(&lesson_id).is_some() {
            return Err(QueueError::AlreadyQueued(lesson_id));
        }
        self.entries.push(QueuedLesson {
            lesson_id,
            duration_minutes: duration_minutes.min(remaining_minutes),
            remaining_minutes,
            students,
            manual_minutes: 0,
            gap_closure_minutes: 0,
            scheduled_start: None,
            has_gap: false,
        });
        self.recompute_or_rollback(schedule)
    }

    pub fn remove_lesson(
        &mut self,
        schedule: &DaySchedule,
        lesson_id: &str,
    ) -> Result<QueuedLesson, QueueError> {
        let idx = self.index_of(lesson_id)?;
        let backup = self.entries.clone();
        let removed = self.entries.remove(idx);
        match self.recompute(schedule) {
            Ok(()) => Ok(removed),
            Err(err) => {
                self.entries = backup;
                Err(err)
            }
        }
    }

    pub fn set_preferred_start(
        &mut self,
        schedule: &DaySchedule,
        start: Option<TimeOfDay>,
    ) -> Result<(), QueueError> {
        let previous = self.preferred_start;
        self.preferred_start = start;
        match self.recompute(schedule) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.preferred_start = previous;
                let _ = self.recompute(schedule);
                Err(err)
            }
        }
    }

    /// Offset of the whole queue relative to its computed base, carried by
    /// the first entry's manual adjustment.
    pub fn global_offset_minutes(&self) -> i32 {
        self.entries.first().map(|e| e.manual_minutes).unwrap_or(0)
    }

    /// Change an entry's duration, clamped to its remaining entitlement.
    /// Returns the duration actually applied.
    pub fn update_duration(
        &mut self,
        schedule: &DaySchedule,
        lesson_id: &str,
        duration_minutes: u16,
    ) -> Result<u16, QueueError> {
        let idx = self.index_of(lesson_id)?;
        let clamped = duration_minutes.min(self.entries[idx].remaining_minutes);
        let backup = self.entries.clone();
        self.entries[idx].duration_minutes = clamped;
        match self.recompute(schedule) {
            Ok(()) => Ok(clamped),
            Err(err) => {
                self.entries = backup;
                Err(err)
            }
        }
    }

    /// Nudge one entry by `delta_minutes`.
    ///
    /// Moving an entry later eats into the slack in front of its
    /// successor, so a gap closes instead of the whole tail drifting.
    pub fn adjust_start_time(
        &mut self,
        schedule: &DaySchedule,
        lesson_id: &str,
        delta_minutes: i32,
    ) -> Result<(), QueueError> {
        let idx = self.index_of(lesson_id)?;
        let backup = self.entries.clone();
        self.entries[idx].manual_minutes += delta_minutes;
        if delta_minutes > 0 {
            if let Some(next) = self.entries.get_mut(idx + 1) {
                let slack = next.offset_minutes();
                if slack > 0 {
                    next.gap_closure_minutes -= delta_minutes.min(slack);
                }
            }
        }
        match self.recompute(schedule) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.entries = backup;
                Err(err)
            }
        }
    }

    pub fn move_up(&mut self, schedule: &DaySchedule, lesson_id: &str) -> Result<(), QueueError> {
        let idx = self.index_of(lesson_id)?;
        if idx == 0 {
            return Err(QueueError::NothingToSwap);
        }
        self.swap_entries(schedule, idx - 1, idx)
    }

    pub fn move_down(&mut self, schedule: &DaySchedule, lesson_id: &str) -> Result<(), QueueError> {
        let idx = self.index_of(lesson_id)?;
        if idx + 1 >= self.entries.len() {
            return Err(QueueError::NothingToSwap);
        }
        self.swap_entries(schedule, idx, idx + 1)
    }

    fn swap_entries(
        &mut self,
        schedule: &DaySchedule,
        a: usize,
        b: usize,
    ) -> Result<(), QueueError> {
        let backup = self.entries.clone();
        let anchor = self.entries[0]
            .scheduled_start
            .map(|s| s.minutes() as i32);
        self.entries.swap(a, b);
        let targets = compact_starts_preserving_order(&self.entries, anchor);
        self.apply_target_starts(schedule, &targets);
        match self.recompute(schedule) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.entries = backup;
                Err(err)
            }
        }
    }

    /// Rewrite adjustments so the layout cursor reproduces `targets`
    /// (absent conflicts with the committed day).
    fn apply_target_starts(&mut self, schedule: &DaySchedule, targets: &[i32]) {
        let mut cursor = self.base_minutes(schedule);
        for (entry, &target) in self.entries.iter_mut().zip(targets) {
            entry.manual_minutes = target - cursor;
            entry.gap_closure_minutes = 0;
            cursor = target + entry.duration_minutes as i32;
        }
    }

    /// Close the gap between an entry and its predecessor. Returns the
    /// number of minutes actually closed.
    pub fn remove_gap_for_lesson(
        &mut self,
        schedule: &DaySchedule,
        lesson_id: &str,
    ) -> Result<i32, QueueError> {
        let idx = self.index_of(lesson_id)?;
        if idx == 0 {
            return Err(QueueError::NoPredecessor);
        }
        let gap = match (self.entries[idx].scheduled_start, self.entries[idx - 1].scheduled_start) {
            (Some(start), Some(_)) => {
                start.minutes() as i32 - self.entries[idx - 1].end_minutes()
            }
            _ => 0,
        };
        if gap <= 0 {
            return Ok(0);
        }
        let backup = self.entries.clone();
        self.entries[idx].gap_closure_minutes -= gap;
        match self.recompute(schedule) {
            Ok(()) => Ok(gap),
            Err(err) => {
                self.entries = backup;
                Err(err)
            }
        }
    }

    /// Whether an entry could be pulled one step earlier without touching
    /// its predecessor. The first entry can always try.
    pub fn can_move_earlier(&self, lesson_id: &str) -> bool {
        let Ok(idx) = self.index_of(lesson_id) else {
            return false;
        };
        if idx == 0 {
            return true;
        }
        match self.entries[idx].scheduled_start {
            Some(start) => {
                start.minutes() as i32 - EARLIER_MOVE_STEP_MINUTES
                    >= self.entries[idx - 1].end_minutes()
            }
            None => false,
        }
    }

    /// Where the layout cursor begins: the preferred start (or 09:00),
    /// never earlier than the end of the committed day.
    fn base_minutes(&self, schedule: &DaySchedule) -> i32 {
        let preferred = self
            .preferred_start
            .map(|s| s.minutes() as i32)
            .unwrap_or(DEFAULT_QUEUE_START as i32);
        match schedule.last_end_minutes() {
            Some(end) => preferred.max(end),
            None => preferred,
        }
    }

    /// Lay every entry out against the committed day.
    ///
    /// The cursor starts at the base, each entry shifts it by its own
    /// adjustments, and any collision with a committed event jumps the
    /// cursor past everything already booked. All-or-nothing: starts are
    /// only stamped once the whole layout fits the day.
    pub fn recompute(&mut self, schedule: &DaySchedule) -> Result<(), QueueError> {
        let committed = schedule.stored_nodes();
        let mut cursor = self.base_minutes(schedule);
        let mut starts = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            cursor += entry.offset_minutes();
            if cursor < 0 {
                return Err(QueueError::OutOfDay(cursor));
            }
            let duration = entry.duration_minutes as i32;
            let collides = committed
                .iter()
                .any(|node| cursor < node.end_minutes() && cursor + duration > node.start_minutes());
            if collides {
                cursor = find_next_available_slot(committed, duration, cursor);
            }
            if cursor + duration > MINUTES_PER_DAY as i32 {
                return Err(QueueError::OutOfDay(cursor + duration));
            }
            starts.push(cursor);
            cursor += duration;
        }

        for (entry, &start) in self.entries.iter_mut().zip(&starts) {
            entry.scheduled_start = TimeOfDay::from_minutes(start as u16);
        }
        for idx in 0..self.entries.len() {
            self.entries[idx].has_gap = idx > 0
                && self.entries[idx].start_minutes() > self.entries[idx - 1].end_minutes();
        }
        Ok(())
    }

    fn recompute_or_rollback(&mut self, schedule: &DaySchedule) -> Result<(), QueueError> {
        match self.recompute(schedule) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.entries.pop();
                Err(err)
            }
        }
    }
}
