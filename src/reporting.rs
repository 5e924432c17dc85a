//! Tabular reporting over one or more day schedules.

use crate::calculations::total_gap_minutes;
use crate::schedule::DaySchedule;
use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;

/// Flatten schedules into one event-per-row frame for export or display.
pub fn events_dataframe(schedules: &[DaySchedule]) -> PolarsResult<DataFrame> {
    let mut teacher_ids = Vec::new();
    let mut dates = Vec::new();
    let mut lesson_ids = Vec::new();
    let mut starts = Vec::new();
    let mut durations = Vec::new();
    let mut student_counts = Vec::new();

    for schedule in schedules {
        for node in schedule.stored_nodes() {
            teacher_ids.push(schedule.teacher_id().to_string());
            dates.push(schedule.date().format("%Y-%m-%d").to_string());
            lesson_ids.push(node.event.lesson_id.clone());
            starts.push(node.start.to_string());
            durations.push(node.duration_minutes as u32);
            student_counts.push(node.event.student_count as u32);
        }
    }

    let columns = vec![
        Series::new(PlSmallStr::from_static("teacher_id"), teacher_ids).into_column(),
        Series::new(PlSmallStr::from_static("date"), dates).into_column(),
        Series::new(PlSmallStr::from_static("lesson_id"), lesson_ids).into_column(),
        Series::new(PlSmallStr::from_static("start"), starts).into_column(),
        Series::new(PlSmallStr::from_static("duration_minutes"), durations).into_column(),
        Series::new(PlSmallStr::from_static("student_count"), student_counts).into_column(),
    ];
    DataFrame::new(columns)
}

/// Per-day load summary. `utilization` is booked time over the day's span
/// from first start to last end.
#[derive(Debug, Clone, PartialEq)]
pub struct DayUtilization {
    pub teacher_id: String,
    pub date: NaiveDate,
    pub event_count: usize,
    pub booked_minutes: i32,
    pub gap_minutes: i32,
    pub span_minutes: i32,
    pub utilization: f64,
}

pub fn day_utilization(schedules: &[DaySchedule]) -> Vec<DayUtilization> {
    schedules
        .par_iter()
        .map(|schedule| {
            let nodes = schedule.stored_nodes();
            let booked: i32 = nodes.iter().map(|n| n.duration_minutes as i32).sum();
            let gaps = total_gap_minutes(nodes);
            let span = match (nodes.first(), schedule.last_end_minutes()) {
                (Some(first), Some(end)) => end - first.start.minutes() as i32,
                _ => 0,
            };
            DayUtilization {
                teacher_id: schedule.teacher_id().to_string(),
                date: schedule.date(),
                event_count: nodes.len(),
                booked_minutes: booked,
                gap_minutes: gaps,
                span_minutes: span,
                utilization: if span > 0 {
                    booked as f64 / span as f64
                } else {
                    0.0
                },
            }
        })
        .collect()
}
