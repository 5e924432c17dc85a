use super::TimedItem;

/// Idle span between two adjacent items. Never stored; always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapSpan {
    pub start_minutes: i32,
    pub duration_minutes: i32,
}

pub const DEFAULT_MIN_GAP_MINUTES: i32 = 15;

fn chronological_indices<T: TimedItem>(items: &[T]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| items[i].start_minutes());
    order
}

/// All gaps between chronologically adjacent items.
///
/// A gap exists wherever an item ends strictly before the next one starts;
/// contiguous or overlapping items produce nothing.
pub fn detect_schedule_gaps<T: TimedItem>(items: &[T]) -> Vec<GapSpan> {
    let order = chronological_indices(items);
    let mut gaps = Vec::new();
    for pair in order.windows(2) {
        let current = &items[pair[0]];
        let next = &items[pair[1]];
        let idle = next.start_minutes() - current.end_minutes();
        if idle > 0 {
            gaps.push(GapSpan {
                start_minutes: current.end_minutes(),
                duration_minutes: idle,
            });
        }
    }
    gaps
}

/// Whether any gap of at least `min_gap_minutes` exists.
pub fn has_schedule_gaps<T: TimedItem>(items: &[T], min_gap_minutes: i32) -> bool {
    detect_schedule_gaps(items)
        .iter()
        .any(|gap| gap.duration_minutes >= min_gap_minutes)
}

/// Sum of all positive inter-item gaps.
pub fn total_gap_minutes<T: TimedItem>(items: &[T]) -> i32 {
    detect_schedule_gaps(items)
        .iter()
        .map(|gap| gap.duration_minutes)
        .sum()
}
