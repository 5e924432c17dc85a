use chrono::Utc;
use lesson_schedule::{
    DaySchedule, EventData, LessonQueue, TimeOfDay, TimelineEntry, apply_reorganization,
    events_dataframe, load_schedule_from_csv, load_schedule_from_json,
    perform_compact_reorganization, reorganization_options, save_schedule_to_csv,
    save_schedule_to_json, shift_first_event_and_reorganize,
};
use polars::prelude::{AnyValue, DataFrame};
use std::io::{self, Write};

fn parse_students(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for (ci, col) in columns.iter().enumerate() {
        for row_idx in 0..df.height() {
            if let Ok(ref av) = col.get(row_idx) {
                let s = match av {
                    AnyValue::Null => String::new(),
                    AnyValue::UInt32(v) => v.to_string(),
                    AnyValue::Int64(v) => v.to_string(),
                    AnyValue::String(s) => s.to_string(),
                    _ => av.to_string(),
                };
                if s.len() > widths[ci] {
                    widths[ci] = s.len();
                }
            }
        }
    }

    let mut sep = String::new();
    sep.push('+');
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');

    out.push('|');
    for (i, name) in col_names.iter().enumerate() {
        out.push(' ');
        out.push_str(name);
        let pad = widths[i] - name.len();
        if pad > 0 {
            out.push_str(&" ".repeat(pad));
        }
        out.push(' ');
        out.push('|');
    }
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');

    for row_idx in 0..df.height() {
        out.push('|');
        for (ci, col) in columns.iter().enumerate() {
            let mut s = String::new();
            if let Ok(ref av) = col.get(row_idx) {
                s = match av {
                    AnyValue::Null => String::new(),
                    AnyValue::UInt32(v) => v.to_string(),
                    AnyValue::Int64(v) => v.to_string(),
                    AnyValue::String(st) => st.to_string(),
                    _ => av.to_string(),
                };
            }
            out.push(' ');
            out.push_str(&s);
            let pad = widths[ci].saturating_sub(s.len());
            if pad > 0 {
                out.push_str(&" ".repeat(pad));
            }
            out.push(' ');
            out.push('|');
        }
        out.push('\n');
    }

    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show the day's timeline\n  add <lesson_id> <HH:MM> <minutes> [students_csv]\n                                     Book a committed event\n  remove <node_id>                   Remove an event\n  options <node_id>                  Show reorganization options for removing an event\n  removecompact <node_id>            Remove an event and compact the followers\n  slot <minutes> [HH:MM]             Show where a new event of that length would land\n  compact                            Remove every gap in the day\n  shift <minutes>                    Move the first event and cascade the rest\n  queue show                         Show the provisional queue\n  queue add <lesson_id> <minutes> [students_csv]\n  queue remove <lesson_id>\n  queue start <HH:MM|none>           Set or clear the preferred queue start\n  queue duration <lesson_id> <minutes>\n  queue nudge <lesson_id> <delta_minutes>\n  queue up <lesson_id>               Swap with the previous entry\n  queue down <lesson_id>             Swap with the next entry\n  queue closegap <lesson_id>         Close the gap before an entry\n  report                             Show the day as a table\n  save <json|csv> <path>             Persist the committed schedule\n  load <json|csv> <path>             Load a committed schedule\n  quit|exit                          Exit"
    );
}

fn print_timeline(schedule: &DaySchedule) {
    println!(
        "{} ({}) on {}:",
        schedule.teacher_name(),
        schedule.teacher_id(),
        schedule.date()
    );
    if schedule.is_empty() {
        println!("  (no events)");
        return;
    }
    for entry in schedule.timeline() {
        match entry {
            TimelineEntry::Event(node) => {
                let students = if node.event.student_names.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", node.event.student_names.join(", "))
                };
                println!(
                    "  #{:<3} {} +{:>3}min  {}{}",
                    node.id, node.start, node.duration_minutes, node.event.lesson_id, students
                );
            }
            TimelineEntry::Gap {
                start,
                duration_minutes,
            } => {
                println!("       {} +{:>3}min  (gap)", start, duration_minutes);
            }
        }
    }
}

fn print_queue(queue: &LessonQueue) {
    if queue.is_empty() {
        println!("Queue is empty.");
        return;
    }
    match queue.preferred_start() {
        Some(start) => println!("Queue (preferred start {start}):"),
        None => println!("Queue:"),
    }
    for entry in queue.entries() {
        let start = entry
            .scheduled_start
            .map(|s| s.to_string())
            .unwrap_or_else(|| "--:--".to_string());
        let gap = if entry.has_gap { "  (gap before)" } else { "" };
        println!(
            "  {} +{:>3}min  {}{}",
            start, entry.duration_minutes, entry.lesson_id, gap
        );
    }
}

fn main() {
    let mut schedule = DaySchedule::new("teacher-1", "Teacher", Utc::now().date_naive());
    let mut queue = LessonQueue::new();

    println!("Lesson Day Planner (CLI) - type 'help' for commands\n");
    print_timeline(&schedule);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        if stdin.read_line(&mut line).is_err() {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => print_timeline(&schedule),
            "add" => {
                let lesson_s = parts.next();
                let start_s = parts.next();
                let dur_s = parts.next();
                let students_s = parts.next();
                match (lesson_s, start_s, dur_s) {
                    (Some(lesson_id), Some(start_s), Some(dur_s)) => {
                        let start: TimeOfDay = match start_s.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid time (HH:MM)");
                                continue;
                            }
                        };
                        let duration: u16 = match dur_s.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid duration");
                                continue;
                            }
                        };
                        if let Some(conflict) = schedule.check_conflict(start, duration) {
                            match conflict.suggested_start {
                                Some(slot) => println!(
                                    "Slot overlaps event #{}; next free slot starts at {}.",
                                    conflict.node_id, slot
                                ),
                                None => println!(
                                    "Slot overlaps event #{} and no later slot fits the day.",
                                    conflict.node_id
                                ),
                            }
                            continue;
                        }
                        let students = students_s.map(parse_students).unwrap_or_default();
                        let mut event = EventData::new(lesson_id, students.len() as u16);
                        event.student_names = students;
                        match schedule.add_event(start, duration, event) {
                            Ok(node) => {
                                println!("Booked event #{}.", node.id);
                                let _ = queue.recompute(&schedule);
                                print_timeline(&schedule);
                            }
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: add <lesson_id> <HH:MM> <minutes> [students_csv]"),
                }
            }
            "remove" => match parts.next().map(str::parse::<u32>) {
                Some(Ok(id)) => match schedule.remove_node(id) {
                    Ok(node) => {
                        println!("Removed event #{} ({}).", node.id, node.event.lesson_id);
                        let _ = queue.recompute(&schedule);
                        print_timeline(&schedule);
                    }
                    Err(e) => println!("Error: {}", e),
                },
                Some(Err(_)) => println!("Invalid node id"),
                None => println!("Usage: remove <node_id>"),
            },
            "options" => match parts.next().map(str::parse::<u32>) {
                Some(Ok(id)) => match reorganization_options(&schedule, id) {
                    Ok(options) if options.is_empty() => {
                        println!("No reorganization needed; the event is last in the day.");
                    }
                    Ok(options) => {
                        for option in options {
                            println!("{:?}", option);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                },
                Some(Err(_)) => println!("Invalid node id"),
                None => println!("Usage: options <node_id>"),
            },
            "removecompact" => match parts.next().map(str::parse::<u32>) {
                Some(Ok(id)) => {
                    let options = match reorganization_options(&schedule, id) {
                        Ok(v) => v,
                        Err(e) => {
                            println!("Error: {}", e);
                            continue;
                        }
                    };
                    match schedule.remove_node(id) {
                        Ok(node) => println!("Removed event #{} ({}).", node.id, node.event.lesson_id),
                        Err(e) => {
                            println!("Error: {}", e);
                            continue;
                        }
                    }
                    if let Some(option) = options.first() {
                        match apply_reorganization(&mut schedule, option) {
                            Ok(_) => println!("Followers compacted."),
                            Err(e) => println!("Error compacting: {}", e),
                        }
                    }
                    let _ = queue.recompute(&schedule);
                    print_timeline(&schedule);
                }
                Some(Err(_)) => println!("Invalid node id"),
                None => println!("Usage: removecompact <node_id>"),
            },
            "slot" => {
                let dur_s = parts.next();
                let default_s = parts.next();
                match dur_s.map(str::parse::<u16>) {
                    Some(Ok(duration)) => {
                        let default_start = match default_s {
                            Some(s) => match s.parse::<TimeOfDay>() {
                                Ok(v) => v,
                                Err(_) => {
                                    println!("Invalid time (HH:MM)");
                                    continue;
                                }
                            },
                            None => TimeOfDay::from_hm(9, 0).unwrap(),
                        };
                        match schedule.possible_slot(duration, default_start) {
                            Some(slot) => println!("Next slot for {duration}min: {slot}"),
                            None => println!("No slot of {duration}min fits the day."),
                        }
                    }
                    _ => println!("Usage: slot <minutes> [HH:MM]"),
                }
            }
            "compact" => match perform_compact_reorganization(&mut schedule) {
                Ok(_) => {
                    println!("Schedule compacted.");
                    let _ = queue.recompute(&schedule);
                    print_timeline(&schedule);
                }
                Err(e) => println!("Error: {}", e),
            },
            "shift" => match parts.next().map(str::parse::<i32>) {
                Some(Ok(offset)) => {
                    match shift_first_event_and_reorganize(&mut schedule, offset) {
                        Ok(_) => {
                            println!("Schedule shifted by {offset} minutes.");
                            let _ = queue.recompute(&schedule);
                            print_timeline(&schedule);
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                }
                Some(Err(_)) => println!("Invalid offset"),
                None => println!("Usage: shift <minutes>"),
            },
            "queue" => match parts.next() {
                Some("show") | None => print_queue(&queue),
                Some("add") => {
                    let lesson_s = parts.next();
                    let dur_s = parts.next();
                    let students_s = parts.next();
                    match (lesson_s, dur_s.map(str::parse::<u16>)) {
                        (Some(lesson_id), Some(Ok(duration))) => {
                            let students = students_s.map(parse_students).unwrap_or_default();
                            match queue.add_lesson(
                                &schedule, lesson_id, duration, duration, students, None,
                            ) {
                                Ok(_) => print_queue(&queue),
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!("Usage: queue add <lesson_id> <minutes> [students_csv]"),
                    }
                }
                Some("remove") => match parts.next() {
                    Some(lesson_id) => match queue.remove_lesson(&schedule, lesson_id) {
                        Ok(removed) => {
                            println!("Removed {} from the queue.", removed.lesson_id);
                            print_queue(&queue);
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: queue remove <lesson_id>"),
                },
                Some("start") => match parts.next() {
                    Some("none") => match queue.set_preferred_start(&schedule, None) {
                        Ok(_) => print_queue(&queue),
                        Err(e) => println!("Error: {}", e),
                    },
                    Some(start_s) => match start_s.parse::<TimeOfDay>() {
                        Ok(start) => match queue.set_preferred_start(&schedule, Some(start)) {
                            Ok(_) => print_queue(&queue),
                            Err(e) => println!("Error: {}", e),
                        },
                        Err(_) => println!("Invalid time (HH:MM)"),
                    },
                    None => println!("Usage: queue start <HH:MM|none>"),
                },
                Some("duration") => {
                    let lesson_s = parts.next();
                    let dur_s = parts.next();
                    match (lesson_s, dur_s.map(str::parse::<u16>)) {
                        (Some(lesson_id), Some(Ok(duration))) => {
                            match queue.update_duration(&schedule, lesson_id, duration) {
                                Ok(applied) => {
                                    if applied != duration {
                                        println!(
                                            "Clamped to {applied} minutes (remaining entitlement)."
                                        );
                                    }
                                    print_queue(&queue);
                                }
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!("Usage: queue duration <lesson_id> <minutes>"),
                    }
                }
                Some("nudge") => {
                    let lesson_s = parts.next();
                    let delta_s = parts.next();
                    match (lesson_s, delta_s.map(str::parse::<i32>)) {
                        (Some(lesson_id), Some(Ok(delta))) => {
                            match queue.adjust_start_time(&schedule, lesson_id, delta) {
                                Ok(_) => print_queue(&queue),
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!("Usage: queue nudge <lesson_id> <delta_minutes>"),
                    }
                }
                Some("up") => match parts.next() {
                    Some(lesson_id) => match queue.move_up(&schedule, lesson_id) {
                        Ok(_) => print_queue(&queue),
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: queue up <lesson_id>"),
                },
                Some("down") => match parts.next() {
                    Some(lesson_id) => match queue.move_down(&schedule, lesson_id) {
                        Ok(_) => print_queue(&queue),
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: queue down <lesson_id>"),
                },
                Some("closegap") => match parts.next() {
                    Some(lesson_id) => match queue.remove_gap_for_lesson(&schedule, lesson_id) {
                        Ok(closed) => {
                            println!("Closed {closed} minutes.");
                            print_queue(&queue);
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: queue closegap <lesson_id>"),
                },
                Some(other) => {
                    println!("Unknown queue command '{}'.", other);
                    println!(
                        "Usage: queue show|add|remove|start|duration|nudge|up|down|closegap ..."
                    );
                }
            },
            "report" => match events_dataframe(std::slice::from_ref(&schedule)) {
                Ok(frame) => println!("{}", render_df_as_text_table(&frame)),
                Err(e) => println!("Error building report: {}", e),
            },
            "save" => {
                let fmt = parts.next();
                let path = parts.next();
                match (fmt, path) {
                    (Some("json"), Some(path)) => match save_schedule_to_json(&schedule, path) {
                        Ok(_) => println!("Schedule saved to {}.", path),
                        Err(e) => println!("Error saving schedule: {}", e),
                    },
                    (Some("csv"), Some(path)) => match save_schedule_to_csv(&schedule, path) {
                        Ok(_) => println!("Schedule saved to {}.", path),
                        Err(e) => println!("Error saving schedule: {}", e),
                    },
                    _ => println!("Usage: save <json|csv> <path>"),
                }
            }
            "load" => {
                let fmt = parts.next();
                let path = parts.next();
                match (fmt, path) {
                    (Some("json"), Some(path)) => match load_schedule_from_json(path) {
                        Ok(loaded) => {
                            schedule = loaded;
                            let _ = queue.recompute(&schedule);
                            println!("Schedule loaded from {}.", path);
                            print_timeline(&schedule);
                        }
                        Err(e) => println!("Error loading schedule: {}", e),
                    },
                    (Some("csv"), Some(path)) => match load_schedule_from_csv(path) {
                        Ok(loaded) => {
                            schedule = loaded;
                            let _ = queue.recompute(&schedule);
                            println!("Schedule loaded from {}.", path);
                            print_timeline(&schedule);
                        }
                        Err(e) => println!("Error loading schedule: {}", e),
                    },
                    _ => println!("Usage: load <json|csv> <path>"),
                }
            }
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
