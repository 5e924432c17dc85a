#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::NamedTempFile;

#[allow(deprecated)]
fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.write_stdin(script.to_string()).assert()
}

#[test]
fn cli_books_and_shows_events() {
    run_cli("add surf-1 09:00 60 Maya,Jon\nadd surf-2 11:00 90\nshow\nquit\n")
        .success()
        .stdout(str_contains("Booked event #1."))
        .stdout(str_contains("(gap)"))
        .stdout(str_contains("surf-2"));
}

#[test]
fn cli_rejects_overlapping_bookings_with_a_suggestion() {
    run_cli("add surf-1 09:00 120\nadd surf-2 10:00 60\nquit\n")
        .success()
        .stdout(str_contains("next free slot starts at 11:00"));
}

#[test]
fn cli_compacts_the_day_after_a_removal() {
    run_cli("add surf-1 09:00 60\nadd surf-2 10:30 60\nadd surf-3 12:00 60\nremovecompact 2\nshow\nquit\n")
        .success()
        .stdout(str_contains("Removed event #2 (surf-2)."))
        .stdout(str_contains("Followers compacted."))
        .stdout(str_contains("#3   10:00"));
}

#[test]
fn cli_queue_lays_lessons_after_the_committed_day() {
    run_cli("add surf-1 09:00 60\nqueue add plan-1 90\nqueue add plan-2 30\nqueue show\nquit\n")
        .success()
        .stdout(str_contains("10:00 + 90min  plan-1"))
        .stdout(str_contains("11:30 + 30min  plan-2"));
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    let script = format!(
        "add surf-1 09:00 60\nsave json {}\nadd surf-2 11:00 60\nload json {}\nshow\nquit\n",
        path, path
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(
        output.contains("Schedule loaded from"),
        "expected output to mention load completion"
    );
    let after_reload = output
        .split("Schedule loaded from")
        .last()
        .unwrap_or_default();
    assert!(
        after_reload.contains("surf-1"),
        "persisted event should survive the reload:\n{}",
        after_reload
    );
    assert!(
        !after_reload.contains("surf-2"),
        "unsaved event should not appear after reload:\n{}",
        after_reload
    );
}

#[test]
fn cli_report_renders_a_table() {
    run_cli("add surf-1 09:00 60\nreport\nquit\n")
        .success()
        .stdout(str_contains("| lesson_id"))
        .stdout(str_contains("| surf-1"));
}
