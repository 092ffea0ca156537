mod support;

use std::fs;

use predicates::prelude::*;
use predicates::str::contains;

use support::TestData;

#[test]
fn add_then_list_shows_task() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();

    data.cmd()
        .args(["add", "Buy milk", "--priority", "high", "--category", "shopping"])
        .assert()
        .success()
        .stdout(contains("Added task"));

    data.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("Buy milk").and(contains("high")).and(contains("shopping")));

    let stored = data.read_tasks();
    assert_eq!(stored[0]["text"], "Buy milk");
    assert_eq!(stored[0]["category"], "shopping");
    assert_eq!(stored[0]["completed"], false);
    Ok(())
}

#[test]
fn toggle_by_text_and_filter_by_status() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.cmd().args(["add", "Buy milk"]).assert().success();
    data.cmd().args(["add", "Walk dog"]).assert().success();

    data.cmd()
        .args(["toggle", "buy milk"])
        .assert()
        .success()
        .stdout(contains("completed"));

    data.cmd()
        .args(["list", "--status", "completed"])
        .assert()
        .success()
        .stdout(contains("Buy milk").and(contains("Walk dog").not()));

    let stored = data.read_tasks();
    assert!(stored[0]["completedAt"].is_string());
    Ok(())
}

#[test]
fn blank_text_is_a_user_error() {
    let data = TestData::new();
    data.cmd()
        .args(["add", "   "])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("task text cannot be empty"));
}

#[test]
fn unknown_task_is_a_user_error() {
    let data = TestData::new();
    data.cmd()
        .args(["delete", "nope"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("Task not found"));
}

#[test]
fn quota_overflow_fails_the_write() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.write_config("quota_bytes = 16\n")?;
    data.cmd()
        .args(["add", "This will not fit"])
        .assert()
        .failure()
        .code(4)
        .stderr(contains("quota exceeded"));
    assert!(!data.path().join("tasky_tasks.json").exists());
    Ok(())
}

#[test]
fn csv_export_imports_into_fresh_store() -> Result<(), Box<dyn std::error::Error>> {
    let source = TestData::new();
    source
        .cmd()
        .args(["add", "Pay rent, today", "--category", "home", "--due", "2024-03-15"])
        .assert()
        .success();
    let out = source.path().join("out.csv");
    source
        .cmd()
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("Exported 1 task(s)"));

    let target = TestData::new();
    target
        .cmd()
        .arg("import")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("Imported 1 task(s)"));

    let stored = target.read_tasks();
    assert_eq!(stored[0]["text"], "Pay rent, today");
    assert_eq!(stored[0]["category"], "home");
    assert_eq!(stored[0]["deadline"], "2024-03-15");
    Ok(())
}

#[test]
fn malformed_import_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.cmd().args(["add", "Keep me"]).assert().success();
    let bad = data.write_file("bad.json", r#"{"tasks": []}"#)?;

    data.cmd()
        .arg("import")
        .arg(&bad)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("expected a JSON array"));

    assert_eq!(data.read_tasks().as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn binary_import_is_a_user_error() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    let bad = data.path().join("tasks.csv");
    fs::write(&bad, [0xC0, 0xFF, 0xFE, 0x00])?;

    data.cmd()
        .arg("import")
        .arg(&bad)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("not UTF-8"));
    assert!(!data.path().join("tasky_tasks.json").exists());
    Ok(())
}

#[test]
fn backups_in_data_dir_do_not_use_quota() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.write_config("quota_bytes = 300\n")?;
    data.write_file("tasky-backup-2024-03-01.json", &"b".repeat(200))?;
    data.cmd().args(["add", "Still fits"]).assert().success();
    assert_eq!(data.read_tasks().as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn partial_import_reports_skipped_records() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    let file = data.write_file(
        "in.json",
        r#"[{"id":"1","text":"ok","completed":false},{"id":"2","completed":true}]"#,
    )?;
    data.cmd()
        .arg("import")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("Imported 1 task(s)").and(contains("Skipped 1 invalid record(s)")));
    Ok(())
}

#[test]
fn stats_json_counts_tasks() {
    let data = TestData::new();
    data.cmd().args(["add", "One", "--priority", "high"]).assert().success();
    data.cmd().args(["add", "Two"]).assert().success();
    data.cmd().args(["toggle", "two"]).assert().success();

    data.cmd()
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(
            contains("\"total\": 2")
                .and(contains("\"completed\": 1"))
                .and(contains("\"highPriority\": 1"))
                .and(contains("\"progress\": 50")),
        );
}

#[test]
fn calendar_day_lists_due_tasks() {
    let data = TestData::new();
    data.cmd()
        .args(["add", "Dentist", "--due", "2024-03-15"])
        .assert()
        .success();
    data.cmd()
        .args(["calendar", "day", "2024-03-15"])
        .assert()
        .success()
        .stdout(contains("Dentist"));
    data.cmd()
        .args(["calendar", "day", "2024-03-16"])
        .assert()
        .success()
        .stdout(contains("No tasks due"));
}

#[test]
fn backup_and_restore_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.cmd().args(["add", "Snapshot me"]).assert().success();
    data.cmd().args(["theme", "light"]).assert().success();
    let backup = data.path().join("backup.json");
    data.cmd().args(["backup", "--output"]).arg(&backup).assert().success();

    data.cmd().args(["clear-all", "--yes"]).assert().success();
    data.cmd().args(["theme", "dark"]).assert().success();

    data.cmd()
        .arg("restore")
        .arg(&backup)
        .assert()
        .success()
        .stdout(contains("Restored 1 task(s)"));
    data.cmd()
        .arg("theme")
        .assert()
        .success()
        .stdout(contains("Theme: light"));
    data.cmd().arg("list").assert().success().stdout(contains("Snapshot me"));

    let raw = fs::read_to_string(&backup)?;
    assert!(raw.contains("\"version\": \"2.0\""));
    Ok(())
}

#[test]
fn clear_all_requires_confirmation() {
    let data = TestData::new();
    data.cmd().args(["add", "Stay"]).assert().success();
    data.cmd().arg("clear-all").assert().failure().code(2);
    data.cmd().arg("list").assert().success().stdout(contains("Stay"));
}

#[test]
fn language_changes_csv_wording() {
    let data = TestData::new();
    data.cmd().args(["add", "Read"]).assert().success();
    data.cmd().args(["lang", "uk"]).assert().success();
    data.cmd()
        .args(["export", "--format", "csv", "--output", "-"])
        .assert()
        .success()
        .stdout(contains("Текст").and(contains("\"Ні\"")));
}

#[test]
fn subtasks_show_progress() {
    let data = TestData::new();
    data.cmd().args(["add", "Trip"]).assert().success();
    data.cmd().args(["subtask", "add", "trip", "Book hotel"]).assert().success();
    data.cmd().args(["subtask", "add", "trip", "Pack"]).assert().success();
    data.cmd()
        .args(["subtask", "toggle", "trip", "2"])
        .assert()
        .success()
        .stdout(contains("(1/2 done)"));
    data.cmd()
        .args(["view", "trip"])
        .assert()
        .success()
        .stdout(contains("2. [x] Pack"));
}
