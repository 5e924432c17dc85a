//! Proposal-and-apply reorganization of a committed day, plus the diff
//! computation that turns a reorganized schedule into per-event writes for
//! the external store.

use crate::calculations::{TimedItem, compact_starts, find_next_available_slot};
use crate::persistence::EventTimeUpdate;
use crate::schedule::{DaySchedule, ScheduleError};
use crate::timeutil::{MINUTES_PER_DAY, TimeOfDay, compose_utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps a lesson id to the external store's event id for that day.
/// Nodes whose lesson is absent from the map are skipped when diffing.
pub type ExternalIdMap = HashMap<String, String>;

/// A concrete way to rearrange the day around a removed or shifted event.
///
/// Options are pure proposals; nothing moves until one is passed to
/// [`apply_reorganization`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReorganizationOption {
    /// Relocate one event to the next free slot after everything else.
    ShiftNext { node_id: u32 },
    /// Pull the listed events forward into the vacated span, closing the
    /// hole and every gap after it.
    CompactSchedule {
        nodes_to_move: Vec<u32>,
        time_saved_minutes: u16,
        vacated_start: TimeOfDay,
    },
}

/// Proposals for closing the hole an event at `node_id` would leave.
///
/// Empty when the node is last in the day (removing it leaves no hole).
pub fn reorganization_options(
    schedule: &DaySchedule,
    node_id: u32,
) -> Result<Vec<ReorganizationOption>, ScheduleError> {
    let removed = schedule
        .find_node(node_id)
        .ok_or(ScheduleError::NodeNotFound { node_id })?;

    let followers: Vec<u32> = schedule
        .stored_nodes()
        .iter()
        .filter(|n| n.start > removed.start || (n.start == removed.start && n.id > removed.id))
        .map(|n| n.id)
        .collect();
    if followers.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![ReorganizationOption::CompactSchedule {
        nodes_to_move: followers,
        time_saved_minutes: removed.duration_minutes,
        vacated_start: removed.start,
    }])
}

/// Carry out a previously proposed reorganization.
///
/// The referenced node is expected to have been removed already; stale
/// node ids inside the option surface as `NodeNotFound`.
pub fn apply_reorganization(
    schedule: &mut DaySchedule,
    option: &ReorganizationOption,
) -> Result<(), ScheduleError> {
    match option {
        ReorganizationOption::ShiftNext { node_id } => {
            let moving = schedule
                .find_node(*node_id)
                .ok_or(ScheduleError::NodeNotFound { node_id: *node_id })?;
            let duration = moving.duration_minutes;
            let others: Vec<_> = schedule
                .stored_nodes()
                .iter()
                .filter(|n| n.id != *node_id)
                .cloned()
                .collect();
            let slot = find_next_available_slot(
                &others,
                duration as i32,
                moving.start_minutes(),
            );
            let start = u16::try_from(slot)
                .ok()
                .and_then(TimeOfDay::from_minutes)
                .filter(|s| s.minutes() as i32 + duration as i32 <= MINUTES_PER_DAY as i32)
                .ok_or(ScheduleError::OutOfDay { minutes: slot })?;
            schedule.set_node_start(*node_id, start)
        }
        ReorganizationOption::CompactSchedule {
            nodes_to_move,
            vacated_start,
            ..
        } => {
            let first_moved_start = nodes_to_move
                .iter()
                .filter_map(|id| schedule.find_node(*id))
                .map(|n| n.start_minutes())
                .min();
            // Anchor at the end of whatever stays put before the moved
            // block, or at the vacated slot when nothing does.
            let base = schedule
                .stored_nodes()
                .iter()
                .filter(|n| !nodes_to_move.contains(&n.id))
                .filter(|n| first_moved_start.is_none_or(|first| n.start_minutes() < first))
                .map(TimedItem::end_minutes)
                .max()
                .unwrap_or(vacated_start.minutes() as i32);

            let mut cursor = base;
            for id in nodes_to_move {
                let duration = schedule
                    .find_node(*id)
                    .ok_or(ScheduleError::NodeNotFound { node_id: *id })?
                    .duration_minutes;
                let start = u16::try_from(cursor)
                    .ok()
                    .and_then(TimeOfDay::from_minutes)
                    .filter(|s| s.minutes() as i32 + duration as i32 <= MINUTES_PER_DAY as i32)
                    .ok_or(ScheduleError::OutOfDay { minutes: cursor })?;
                schedule.set_node_start(*id, start)?;
                cursor += duration as i32;
            }
            Ok(())
        }
    }
}

/// Move the first event by `offset_minutes` and cascade every later event
/// back-to-back behind it. Interior gaps do not survive the shift.
pub fn shift_first_event_and_reorganize(
    schedule: &mut DaySchedule,
    offset_minutes: i32,
) -> Result<(), ScheduleError> {
    let nodes = schedule.stored_nodes();
    let first = nodes.first().ok_or(ScheduleError::NotEnoughEvents)?;

    let mut cursor = first.start_minutes() + offset_minutes;
    if cursor < 0 {
        return Err(ScheduleError::OutOfDay { minutes: cursor });
    }
    let mut starts = Vec::with_capacity(nodes.len());
    for node in nodes {
        starts.push(cursor);
        cursor += node.duration_minutes as i32;
    }
    schedule.apply_starts(&starts)
}

/// Remove every interior gap, anchoring at the first event's current start.
pub fn perform_compact_reorganization(schedule: &mut DaySchedule) -> Result<(), ScheduleError> {
    if schedule.len() < 2 {
        return Err(ScheduleError::NotEnoughEvents);
    }
    let starts = compact_starts(schedule.stored_nodes());
    schedule.apply_starts(&starts)
}

fn diff_against(
    schedule: &DaySchedule,
    before: &HashMap<u32, TimeOfDay>,
    ids: &ExternalIdMap,
) -> Vec<EventTimeUpdate> {
    schedule
        .stored_nodes()
        .iter()
        .filter(|node| before.get(&node.id) != Some(&node.start))
        .filter_map(|node| {
            ids.get(&node.event.lesson_id).map(|external| EventTimeUpdate {
                external_event_id: external.clone(),
                new_datetime: compose_utc(schedule.date(), node.start),
            })
        })
        .collect()
}

fn snapshot_starts(schedule: &DaySchedule) -> HashMap<u32, TimeOfDay> {
    schedule
        .stored_nodes()
        .iter()
        .map(|n| (n.id, n.start))
        .collect()
}

/// The store writes that removing `node_id` and compacting would cause.
/// Pure simulation; the given schedule is not touched.
pub fn updates_after_node_removal(
    schedule: &DaySchedule,
    node_id: u32,
    ids: &ExternalIdMap,
) -> Result<Vec<EventTimeUpdate>, ScheduleError> {
    let before = snapshot_starts(schedule);
    let mut scratch = schedule.clone();
    let removed = scratch.remove_node(node_id)?;
    if !scratch.is_empty() {
        let option = ReorganizationOption::CompactSchedule {
            nodes_to_move: scratch
                .stored_nodes()
                .iter()
                .filter(|n| n.start >= removed.start)
                .map(|n| n.id)
                .collect(),
            time_saved_minutes: 0,
            vacated_start: removed.start,
        };
        apply_reorganization(&mut scratch, &option)?;
    }
    Ok(diff_against(&scratch, &before, ids))
}

/// The store writes a proposed option would cause, without applying it.
pub fn updates_for_reorganization(
    schedule: &DaySchedule,
    option: &ReorganizationOption,
    ids: &ExternalIdMap,
) -> Result<Vec<EventTimeUpdate>, ScheduleError> {
    let before = snapshot_starts(schedule);
    let mut scratch = schedule.clone();
    apply_reorganization(&mut scratch, option)?;
    Ok(diff_against(&scratch, &before, ids))
}

/// Compact the day in place and return the writes for every moved event.
pub fn updates_for_compact_reorganization(
    schedule: &mut DaySchedule,
    ids: &ExternalIdMap,
) -> Result<Vec<EventTimeUpdate>, ScheduleError> {
    let before = snapshot_starts(schedule);
    perform_compact_reorganization(schedule)?;
    Ok(diff_against(schedule, &before, ids))
}

/// Shift the whole day in place and return the writes for every moved event.
pub fn updates_for_shifted_schedule(
    schedule: &mut DaySchedule,
    offset_minutes: i32,
    ids: &ExternalIdMap,
) -> Result<Vec<EventTimeUpdate>, ScheduleError> {
    let before = snapshot_starts(schedule);
    shift_first_event_and_reorganize(schedule, offset_minutes)?;
    Ok(diff_against(schedule, &before, ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EventData;
    use chrono::NaiveDate;

    fn t(h: u16, m: u16) -> TimeOfDay {
        TimeOfDay::from_hm(h, m).unwrap()
    }

    fn day_with(slots: &[(u16, u16, u16)]) -> DaySchedule {
        let mut schedule =
            DaySchedule::new("t-1", "Alex", NaiveDate::from_ymd_opt(2025, 7, 14).unwrap());
        for (i, &(h, m, duration)) in slots.iter().enumerate() {
            schedule
                .add_event(t(h, m), duration, EventData::new(format!("L{}", i + 1), 1))
                .unwrap();
        }
        schedule
    }

    #[test]
    fn removing_a_middle_event_proposes_compaction() {
        let schedule = day_with(&[(9, 0, 60), (10, 0, 60), (11, 0, 60)]);
        let middle = schedule.stored_nodes()[1].id;

        let options = reorganization_options(&schedule, middle).unwrap();
        assert_eq!(options.len(), 1);
        match &options[0] {
            ReorganizationOption::CompactSchedule {
                nodes_to_move,
                time_saved_minutes,
                vacated_start,
            } => {
                assert_eq!(nodes_to_move, &vec![schedule.stored_nodes()[2].id]);
                assert_eq!(*time_saved_minutes, 60);
                assert_eq!(*vacated_start, t(10, 0));
            }
            other => panic!("unexpected option: {other:?}"),
        }
    }

    #[test]
    fn removing_the_last_event_needs_no_reorganization() {
        let schedule = day_with(&[(9, 0, 60), (10, 0, 60)]);
        let last = schedule.stored_nodes()[1].id;
        assert!(reorganization_options(&schedule, last).unwrap().is_empty());
    }

    #[test]
    fn compaction_after_removal_pulls_followers_into_the_hole() {
        let mut schedule = day_with(&[(9, 0, 60), (10, 0, 60), (11, 0, 90)]);
        let middle = schedule.stored_nodes()[1].id;
        let options = reorganization_options(&schedule, middle).unwrap();

        schedule.remove_node(middle).unwrap();
        apply_reorganization(&mut schedule, &options[0]).unwrap();

        let starts: Vec<TimeOfDay> = schedule.stored_nodes().iter().map(|n| n.start).collect();
        assert_eq!(starts, vec![t(9, 0), t(10, 0)]);
    }

    #[test]
    fn shift_cascades_all_later_events() {
        let mut schedule = day_with(&[(9, 0, 60), (10, 30, 60), (12, 0, 30)]);
        shift_first_event_and_reorganize(&mut schedule, 45).unwrap();

        let starts: Vec<TimeOfDay> = schedule.stored_nodes().iter().map(|n| n.start).collect();
        assert_eq!(starts, vec![t(9, 45), t(10, 45), t(11, 45)]);
    }

    #[test]
    fn shift_before_midnight_fails_without_mutation() {
        let mut schedule = day_with(&[(0, 30, 60), (2, 0, 60)]);
        let before = schedule.clone();
        let err = shift_first_event_and_reorganize(&mut schedule, -60).unwrap_err();
        assert!(matches!(err, ScheduleError::OutOfDay { .. }));
        assert_eq!(schedule, before);
    }

    #[test]
    fn compact_needs_at_least_two_events() {
        let mut schedule = day_with(&[(9, 0, 60)]);
        assert_eq!(
            perform_compact_reorganization(&mut schedule),
            Err(ScheduleError::NotEnoughEvents)
        );
    }

    #[test]
    fn removal_diff_reports_only_moved_known_events() {
        let schedule = day_with(&[(9, 0, 60), (10, 0, 60), (11, 0, 60)]);
        let middle = schedule.stored_nodes()[1].id;
        let ids: ExternalIdMap = [
            ("L1".to_string(), "ev-1".to_string()),
            ("L3".to_string(), "ev-3".to_string()),
        ]
        .into_iter()
        .collect();

        let updates = updates_after_node_removal(&schedule, middle, &ids).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].external_event_id, "ev-3");
        assert_eq!(
            updates[0].new_datetime,
            compose_utc(schedule.date(), t(10, 0))
        );
        // proposal paths never touch the input
        assert_eq!(schedule.stored_nodes()[1].id, middle);
    }

    #[test]
    fn shift_diff_covers_every_event() {
        let mut schedule = day_with(&[(9, 0, 60), (10, 30, 60)]);
        let ids: ExternalIdMap = [
            ("L1".to_string(), "ev-1".to_string()),
            ("L2".to_string(), "ev-2".to_string()),
        ]
        .into_iter()
        .collect();

        let updates = updates_for_shifted_schedule(&mut schedule, 45, &ids).unwrap();
        assert_eq!(updates.len(), 2);
        let starts: Vec<TimeOfDay> = schedule.stored_nodes().iter().map(|n| n.start).collect();
        assert_eq!(starts, vec![t(9, 45), t(10, 45)]);
    }
}
