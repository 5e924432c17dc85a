use super::TimedItem;

/// New start minutes that remove every gap, anchored at the chronologically
/// first item's current start.
///
/// The result is aligned with the input slice: `result[i]` is the new start
/// for `items[i]`, computed after an internal chronological sort. The first
/// item keeps its start; every later item starts exactly where its
/// predecessor ends.
pub fn compact_starts<T: TimedItem>(items: &[T]) -> Vec<i32> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| items[i].start_minutes());

    let mut starts = vec![0; items.len()];
    let mut cursor = match order.first() {
        Some(&first) => items[first].start_minutes(),
        None => return starts,
    };
    for &idx in &order {
        starts[idx] = cursor;
        cursor += items[idx].duration_minutes();
    }
    starts
}

/// Compaction over a caller-given sequence whose display order may diverge
/// from chronological order (e.g. after a manual queue reordering).
///
/// The walk follows the slice order as-is and anchors at `anchor_minutes`,
/// falling back to the first item's current start.
pub fn compact_starts_preserving_order<T: TimedItem>(
    items: &[T],
    anchor_minutes: Option<i32>,
) -> Vec<i32> {
    let mut cursor = match (anchor_minutes, items.first()) {
        (Some(anchor), _) => anchor,
        (None, Some(first)) => first.start_minutes(),
        (None, None) => return Vec::new(),
    };
    let mut starts = Vec::with_capacity(items.len());
    for item in items {
        starts.push(cursor);
        cursor += item.duration_minutes();
    }
    starts
}

/// First start that fits `duration_minutes` strictly after the last item's
/// end, or `default_start_minutes` when there are no items.
///
/// Interior gaps are deliberately never considered; conflict resolution
/// depends on appended slots staying after everything already booked.
pub fn find_next_available_slot<T: TimedItem>(
    items: &[T],
    _duration_minutes: i32,
    default_start_minutes: i32,
) -> i32 {
    items
        .iter()
        .map(TimedItem::end_minutes)
        .max()
        .unwrap_or(default_start_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Block {
        start: i32,
        duration: i32,
    }

    impl TimedItem for Block {
        fn start_minutes(&self) -> i32 {
            self.start
        }

        fn duration_minutes(&self) -> i32 {
            self.duration
        }
    }

    fn block(start: i32, duration: i32) -> Block {
        Block { start, duration }
    }

    #[test]
    fn compaction_keeps_anchor_and_removes_gaps() {
        let items = vec![block(540, 60), block(660, 90), block(800, 30)];
        let starts = compact_starts(&items);
        assert_eq!(starts, vec![540, 600, 690]);
    }

    #[test]
    fn compaction_follows_time_order_not_slice_order() {
        let items = vec![block(800, 30), block(540, 60)];
        let starts = compact_starts(&items);
        // slice[1] is chronologically first and stays anchored
        assert_eq!(starts, vec![600, 540]);
    }

    #[test]
    fn order_preserving_variant_uses_the_given_sequence() {
        let items = vec![block(660, 90), block(540, 60)];
        let starts = compact_starts_preserving_order(&items, Some(540));
        assert_eq!(starts, vec![540, 630]);
    }

    #[test]
    fn order_preserving_variant_defaults_to_first_item_start() {
        let items = vec![block(660, 90), block(540, 60)];
        assert_eq!(
            compact_starts_preserving_order(&items, None),
            vec![660, 750]
        );
    }

    #[test]
    fn next_slot_is_after_the_last_item() {
        let items = vec![block(540, 60), block(700, 60)];
        assert_eq!(find_next_available_slot(&items, 45, 540), 760);
        let empty: Vec<Block> = Vec::new();
        assert_eq!(find_next_available_slot(&empty, 45, 540), 540);
    }
}
