pub mod compaction;
pub mod gaps;

/// Anything that occupies a contiguous span of minutes within a day.
///
/// The gap and compaction utilities are generic over this trait so that the
/// same math serves committed schedule nodes and provisional queue entries.
pub trait TimedItem {
    fn start_minutes(&self) -> i32;
    fn duration_minutes(&self) -> i32;

    fn end_minutes(&self) -> i32 {
        self.start_minutes() + self.duration_minutes()
    }
}

pub use compaction::{compact_starts, compact_starts_preserving_order, find_next_available_slot};
pub use gaps::{GapSpan, detect_schedule_gaps, has_schedule_gaps, total_gap_minutes};
