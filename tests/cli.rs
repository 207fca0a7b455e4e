use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stride"))
}

fn run_cmd(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin_path())
        .arg("--data-dir")
        .arg(dir)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("run stride")
}

fn output_stdout(output: Output) -> String {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout utf8")
}

fn parse_id(stdout: &str, prefix: &str) -> i64 {
    let line = stdout
        .lines()
        .find(|line| line.starts_with(prefix))
        .unwrap_or_else(|| panic!("missing '{prefix}' in output: {stdout}"));
    let rest = &line[prefix.len()..];
    let id_str = rest.split(':').next().expect("id segment");
    id_str.trim().parse().expect("id parse")
}

fn add_goal(dir: &Path, args: &[&str]) -> i64 {
    let mut cmd = vec!["goal", "add"];
    cmd.extend_from_slice(args);
    let stdout = output_stdout(run_cmd(dir, &cmd));
    parse_id(&stdout, "Created goal ID: ")
}

fn add_task(dir: &Path, args: &[&str]) -> i64 {
    let mut cmd = vec!["task", "add"];
    cmd.extend_from_slice(args);
    let stdout = output_stdout(run_cmd(dir, &cmd));
    parse_id(&stdout, "Created task ID: ")
}

#[test]
fn goal_show_reports_task_progress() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(dir.path(), &["Ship feature"]);
    let goal_arg = goal_id.to_string();
    let first = add_task(
        dir.path(),
        &["Write code", "--goal", &goal_arg, "--size", "2"],
    );
    add_task(dir.path(), &["Review", "--goal", &goal_arg, "--size", "3"]);

    output_stdout(run_cmd(dir.path(), &["task", "done", &first.to_string()]));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "show", &goal_arg]));
    assert!(stdout.contains("Progress: 40% (size 2/5, tasks 1/2)"));
    assert!(stdout.contains("Value: 2"));
    assert!(stdout.contains("- [done] Write code"));
    assert!(stdout.contains("- [open] Review"));
}

#[test]
fn goal_show_json_reports_percent() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(
        dir.path(),
        &["Read 10 books", "--mode", "habit", "--target", "10"],
    );
    let goal_arg = goal_id.to_string();
    output_stdout(run_cmd(dir.path(), &["goal", "progress", &goal_arg, "3"]));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "show", &goal_arg, "--json"]));
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("parse json");
    assert_eq!(value["id"], serde_json::json!(goal_id));
    assert_eq!(value["progress_mode"], serde_json::json!("habit"));
    assert_eq!(
        value["progress"]["percent_complete"],
        serde_json::json!(30.0)
    );
}

#[test]
fn task_done_cascades_through_goal_to_parent() {
    let dir = TempDir::new().expect("temp dir");
    let parent_id = add_goal(dir.path(), &["Year of health", "--mode", "habit"]);
    let goal_id = add_goal(dir.path(), &["Run a 10k", "--parent", &parent_id.to_string()]);
    let goal_arg = goal_id.to_string();
    let task_id = add_task(dir.path(), &["Train", "--goal", &goal_arg]);

    let stdout = output_stdout(run_cmd(dir.path(), &["task", "done", &task_id.to_string()]));
    assert!(stdout.contains(&format!("Task ID: {task_id} marked done.")));
    assert!(stdout.contains("Progress updates:"));
    assert!(stdout.contains(&format!("- Goal ID: {goal_id} progress +1")));
    assert!(stdout.contains(&format!("- Parent goal ID: {parent_id} progress +1")));

    let stdout = output_stdout(run_cmd(
        dir.path(),
        &["task", "undone", &task_id.to_string()],
    ));
    assert!(stdout.contains(&format!("- Parent goal ID: {parent_id} progress -1")));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "show", &parent_id.to_string()]));
    assert!(stdout.contains("Value: 0"));
}

#[test]
fn task_done_batch_reports_count_and_cascade() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(dir.path(), &["Read the stack"]);
    let goal_arg = goal_id.to_string();
    let first = add_task(dir.path(), &["First", "--goal", &goal_arg, "--size", "2"]);
    let second = add_task(dir.path(), &["Second", "--goal", &goal_arg, "--size", "3"]);

    let stdout = output_stdout(run_cmd(
        dir.path(),
        &["task", "done", &first.to_string(), &second.to_string()],
    ));
    assert!(stdout.contains("Marked 2 tasks done."));
    assert!(stdout.contains(&format!("- Goal ID: {goal_id} progress +2")));
    assert!(stdout.contains(&format!("- Goal ID: {goal_id} progress +3 (now 5")));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "show", &goal_arg]));
    assert!(stdout.contains("Progress: 100%"));
}

#[test]
fn goal_done_updates_parent_and_is_idempotent() {
    let dir = TempDir::new().expect("temp dir");
    let parent_id = add_goal(dir.path(), &["Parent"]);
    let child_id = add_goal(dir.path(), &["Child", "--parent", &parent_id.to_string()]);
    let child_arg = child_id.to_string();

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "done", &child_arg]));
    assert!(stdout.contains(&format!("Goal ID: {child_id} marked completed.")));
    assert!(stdout.contains(&format!("- [done] Child (goal id {child_id})")));
    assert!(stdout.contains(&format!("- Parent goal ID: {parent_id} progress +1")));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "done", &child_arg]));
    assert!(stdout.contains(&format!("Goal ID: {child_id} already completed.")));
    assert!(!stdout.contains("Progress updates:"));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "undone", &child_arg]));
    assert!(stdout.contains(&format!("Goal ID: {child_id} marked incomplete.")));
    assert!(stdout.contains(&format!("- [open] Child (goal id {child_id})")));
    assert!(stdout.contains(&format!("- Parent goal ID: {parent_id} progress -1")));
}

#[test]
fn goal_done_missing_goal_fails() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(dir.path(), &["goal", "done", "404"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not found"));
}

#[test]
fn goal_list_counts_and_hides_completed() {
    let dir = TempDir::new().expect("temp dir");
    add_goal(dir.path(), &["First"]);
    let done_id = add_goal(dir.path(), &["Second"]);
    output_stdout(run_cmd(dir.path(), &["goal", "done", &done_id.to_string()]));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "list", "--count"]));
    assert_eq!(stdout.trim(), "Total: 1");

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "list", "--all", "--count"]));
    assert_eq!(stdout.trim(), "Total: 2");

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "list"]));
    assert!(stdout.contains("First"));
    assert!(!stdout.contains("Second"));
}

#[test]
fn goal_progress_rejects_zero_delta() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(dir.path(), &["Savings", "--mode", "manual", "--target", "100"]);
    let output = run_cmd(dir.path(), &["goal", "progress", &goal_id.to_string(), "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid input"));
}

#[test]
fn goal_add_rejects_empty_title() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(dir.path(), &["goal", "add", "  "]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("goal title cannot be empty"));
}

#[test]
fn goal_progress_clamps_at_zero_and_logs() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(dir.path(), &["Savings", "--mode", "manual", "--target", "100"]);
    let goal_arg = goal_id.to_string();

    output_stdout(run_cmd(dir.path(), &["goal", "progress", &goal_arg, "25"]));
    let stdout = output_stdout(run_cmd(
        dir.path(),
        &["goal", "progress", &goal_arg, "-40", "--note", "refund"],
    ));
    assert!(stdout.contains(&format!("Goal ID: {goal_id} progress -40 (now 0).")));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "log", &goal_arg]));
    assert!(stdout.contains("+25"));
    assert!(stdout.contains("-40"));
    assert!(stdout.contains("refund"));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "show", &goal_arg]));
    assert!(stdout.contains("Progress: 0%"));
    assert!(stdout.contains("Value: 0 / 100"));
}

#[test]
fn goal_export_writes_markdown() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(dir.path(), &["Launch", "--mode", "tasks"]);
    let goal_arg = goal_id.to_string();
    let task_id = add_task(
        dir.path(),
        &["Draft post", "--goal", &goal_arg, "--size", "2"],
    );
    output_stdout(run_cmd(dir.path(), &["task", "done", &task_id.to_string()]));

    let path = dir.path().join("exports").join("launch.md");
    let path_arg = path.to_string_lossy().to_string();
    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "export", &goal_arg, &path_arg]));
    assert!(stdout.contains(&format!("Exported goal ID: {goal_id}")));

    let markdown = std::fs::read_to_string(&path).expect("read export");
    assert!(markdown.contains("# Goal: Launch"));
    assert!(markdown.contains("- [x] Draft post *(id:"));
    assert!(markdown.contains("## Progress Log"));
    assert!(markdown.contains("task 'Draft post' completed"));
}

#[test]
fn goal_link_and_unlink_manage_membership() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(dir.path(), &["Goal"]);
    let goal_arg = goal_id.to_string();
    let task_id = add_task(dir.path(), &["Task"]);
    let task_arg = task_id.to_string();

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "link", &goal_arg, &task_arg]));
    assert!(stdout.contains(&format!("Linked task ID: {task_id} to goal ID: {goal_id}")));

    let stdout = output_stdout(run_cmd(dir.path(), &["task", "list", "--goal", &goal_arg]));
    assert!(stdout.contains("Task"));

    let output = run_cmd(dir.path(), &["goal", "link", &goal_arg, &task_arg]);
    assert!(!output.status.success());

    output_stdout(run_cmd(dir.path(), &["goal", "unlink", &goal_arg, &task_arg]));
    let stdout = output_stdout(run_cmd(dir.path(), &["task", "list", "--goal", &goal_arg]));
    assert!(stdout.contains("No tasks found."));
}

#[test]
fn task_remove_reports_count() {
    let dir = TempDir::new().expect("temp dir");
    let first = add_task(dir.path(), &["First"]);
    let second = add_task(dir.path(), &["Second"]);

    let stdout = output_stdout(run_cmd(
        dir.path(),
        &["task", "remove", &first.to_string(), &second.to_string()],
    ));
    assert!(stdout.contains("Removed 2 tasks."));

    let stdout = output_stdout(run_cmd(dir.path(), &["task", "list", "--all"]));
    assert!(stdout.contains("No tasks found."));
}

#[test]
fn task_list_hides_done_by_default() {
    let dir = TempDir::new().expect("temp dir");
    add_task(dir.path(), &["Open task"]);
    let done_id = add_task(dir.path(), &["Done task"]);
    output_stdout(run_cmd(dir.path(), &["task", "done", &done_id.to_string()]));

    let stdout = output_stdout(run_cmd(dir.path(), &["task", "list"]));
    assert!(stdout.contains("Open task"));
    assert!(!stdout.contains("Done task"));

    let stdout = output_stdout(run_cmd(dir.path(), &["task", "list", "--status", "done"]));
    assert!(stdout.contains("Done task"));
    assert!(!stdout.contains("Open task"));
}

#[test]
fn goal_update_changes_mode_and_target() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(dir.path(), &["Goal"]);
    let goal_arg = goal_id.to_string();

    let stdout = output_stdout(run_cmd(
        dir.path(),
        &[
            "goal",
            "update",
            &goal_arg,
            "--mode",
            "habit",
            "--target",
            "21",
            "--title",
            "Meditate daily",
        ],
    ));
    assert!(stdout.contains(&format!("Updated goal ID: {goal_id}: Meditate daily")));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "show", &goal_arg]));
    assert!(stdout.contains("Mode: habit"));
    assert!(stdout.contains("Value: 0 / 21"));
}
