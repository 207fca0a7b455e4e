use chrono::{DateTime, Utc};

use crate::entities::{goal, progress_entry, task};
use crate::progress::GoalView;

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

pub fn format_delta(delta: f64) -> String {
    if delta >= 0.0 {
        format!("+{}", format_value(delta))
    } else {
        format_value(delta)
    }
}

pub fn format_percent(percent: f64) -> String {
    if percent.fract() == 0.0 {
        format!("{percent:.0}%")
    } else {
        format!("{percent:.1}%")
    }
}

pub fn status_word(done: bool) -> &'static str {
    if done {
        "done"
    } else {
        "open"
    }
}

pub fn format_goal_detail(view: &GoalView, tasks: &[task::Model], children: &[GoalView]) -> String {
    let goal = &view.goal;
    let totals = &view.progress.tasks;
    let mut output = String::new();
    output.push_str(&format!("Goal ID: {}\n", goal.id));
    output.push_str(&format!("Title: {}\n", goal.title));
    output.push_str(&format!("Mode: {}\n", goal.progress_mode));
    output.push_str(&format!("Status: {}\n", status_word(goal.marked_complete)));
    output.push_str(&format!(
        "Progress: {} (size {}/{}, tasks {}/{})\n",
        format_percent(view.progress.percent_complete),
        totals.completed_size,
        totals.total_size,
        totals.completed_count,
        totals.count
    ));
    match goal.target_value {
        Some(target) => output.push_str(&format!(
            "Value: {} / {}\n",
            format_value(goal.current_value),
            format_value(target)
        )),
        None => output.push_str(&format!("Value: {}\n", format_value(goal.current_value))),
    }
    if let Some(parent_id) = goal.parent_id {
        output.push_str(&format!("Parent ID: {parent_id}\n"));
    }
    output.push_str(&format!("Created: {}\n", format_datetime(goal.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(goal.updated_at)));
    output.push('\n');

    if tasks.is_empty() {
        output.push_str("Tasks: (none)\n");
    } else {
        output.push_str("Tasks:\n");
        for task in tasks {
            output.push_str(&format!(
                "- [{}] {} (task id {}, size {})\n",
                status_word(task.completed),
                task.title,
                task.id,
                task.size
            ));
        }
    }
    output.push('\n');

    if children.is_empty() {
        output.push_str("Children: (none)");
        return output.trim_end().to_string();
    }
    output.push_str("Children:\n");
    for child in children {
        output.push_str(&format!(
            "- [{}] {} (goal id {}, {})\n",
            status_word(child.goal.marked_complete),
            child.goal.title,
            child.goal.id,
            format_percent(child.progress.percent_complete)
        ));
    }
    output.trim_end().to_string()
}

pub fn format_task_detail(task: &task::Model, goals: &[goal::Model]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Task ID: {}\n", task.id));
    output.push_str(&format!("Title: {}\n", task.title));
    output.push_str(&format!("Size: {}\n", task.size));
    output.push_str(&format!("Status: {}\n", status_word(task.completed)));
    if let Some(parent_id) = task.parent_id {
        output.push_str(&format!("Parent ID: {parent_id}\n"));
    }
    output.push_str(&format!("Created: {}\n", format_datetime(task.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(task.updated_at)));
    output.push('\n');

    if goals.is_empty() {
        output.push_str("Goals: (none)");
        return output;
    }
    output.push_str("Goals:\n");
    for goal in goals {
        output.push_str(&format!(
            "- [{}] {} (goal id {})\n",
            status_word(goal.marked_complete),
            goal.title,
            goal.id
        ));
    }
    output.trim_end().to_string()
}

pub fn format_goal_markdown(
    view: &GoalView,
    tasks: &[task::Model],
    children: &[GoalView],
    entries: &[progress_entry::Model],
) -> String {
    fn checkbox(done: bool) -> &'static str {
        if done {
            "x"
        } else {
            " "
        }
    }

    fn collapse_heading(text: &str) -> String {
        let normalized = text.replace("\r\n", "\n");
        let parts: Vec<&str> = normalized
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();
        if parts.is_empty() {
            "(untitled)".to_string()
        } else {
            parts.join(" / ")
        }
    }

    let goal = &view.goal;
    let totals = &view.progress.tasks;
    let mut lines = Vec::new();
    lines.push(format!("# Goal: {}", collapse_heading(&goal.title)));
    lines.push(String::new());

    lines.push(format!("- **Goal ID:** `{}`", goal.id));
    lines.push(format!("- **Mode:** `{}`", goal.progress_mode));
    lines.push(format!(
        "- **Status:** `{}`",
        status_word(goal.marked_complete)
    ));
    lines.push(format!(
        "- **Progress:** {}",
        format_percent(view.progress.percent_complete)
    ));
    match goal.target_value {
        Some(target) => lines.push(format!(
            "- **Value:** {} / {}",
            format_value(goal.current_value),
            format_value(target)
        )),
        None => lines.push(format!(
            "- **Value:** {}",
            format_value(goal.current_value)
        )),
    }
    if let Some(parent_id) = goal.parent_id {
        lines.push(format!("- **Parent ID:** `{parent_id}`"));
    }
    lines.push(format!(
        "- **Created:** {}",
        format_datetime(goal.created_at)
    ));
    lines.push(format!(
        "- **Updated:** {}",
        format_datetime(goal.updated_at)
    ));
    lines.push(format!(
        "- **Tasks:** {}/{}",
        totals.completed_count, totals.count
    ));
    lines.push(String::new());

    lines.push("## Tasks".to_string());
    lines.push(String::new());
    if tasks.is_empty() {
        lines.push("*No tasks*".to_string());
    } else {
        for task in tasks {
            lines.push(format!(
                "- [{}] {} *(id: {}, size: {})*",
                checkbox(task.completed),
                collapse_heading(&task.title),
                task.id,
                task.size
            ));
        }
    }
    lines.push(String::new());

    lines.push("## Children".to_string());
    lines.push(String::new());
    if children.is_empty() {
        lines.push("*No children*".to_string());
    } else {
        for child in children {
            lines.push(format!(
                "- [{}] {} *(id: {}, {})*",
                checkbox(child.goal.marked_complete),
                collapse_heading(&child.goal.title),
                child.goal.id,
                format_percent(child.progress.percent_complete)
            ));
        }
    }
    lines.push(String::new());

    lines.push("## Progress Log".to_string());
    lines.push(String::new());
    if entries.is_empty() {
        lines.push("*No progress entries*".to_string());
    } else {
        for entry in entries {
            lines.push(format!(
                "- `{}` {} ({})",
                format_delta(entry.delta),
                format_datetime(entry.created_at),
                collapse_heading(&entry.note)
            ));
        }
    }

    lines.join("\n").trim_end().to_string()
}
