//! Daily lesson scheduling engine for one teacher's day.
//!
//! The crate keeps a teacher's committed events in a [`DaySchedule`],
//! stages planned lessons in a [`LessonQueue`] laid out around them, and
//! turns reorganizations into per-event time updates for an external
//! [`EventStore`]. Gap detection and compaction are pure functions over
//! anything implementing [`TimedItem`].

pub mod calculations;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod node;
pub mod persistence;
pub mod queue;
pub mod records;
pub mod reorganize;
pub mod reporting;
pub mod schedule;
pub mod timeutil;

pub use calculations::{
    GapSpan, TimedItem, compact_starts, compact_starts_preserving_order, detect_schedule_gaps,
    find_next_available_slot, has_schedule_gaps, total_gap_minutes,
};
pub use node::{EventData, ScheduleNode, TimelineEntry};
pub use persistence::{
    BatchReport, EventPatch, EventStore, EventTimeUpdate, PersistenceError, PersistenceResult,
    ScheduleSnapshot, apply_time_updates, load_schedule_from_csv, load_schedule_from_json,
    save_schedule_to_csv, save_schedule_to_json, validate_schedule,
};
pub use queue::{Adjustment, LessonQueue, QueueError, QueuedLesson};
pub use records::{LessonEvent, LessonRecord, LessonStatus, StudentBooking};
pub use reorganize::{
    ExternalIdMap, ReorganizationOption, apply_reorganization, perform_compact_reorganization,
    reorganization_options, shift_first_event_and_reorganize, updates_after_node_removal,
    updates_for_compact_reorganization, updates_for_reorganization, updates_for_shifted_schedule,
};
pub use reporting::{DayUtilization, day_utilization, events_dataframe};
pub use schedule::{DaySchedule, ScheduleError, SlotConflict};
pub use timeutil::{MINUTES_PER_DAY, TimeOfDay, TimeParseError, compose_utc};
