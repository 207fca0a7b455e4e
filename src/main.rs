mod app;
mod cli;
mod db;
mod entities;
mod error;
mod model;
mod progress;
mod util;

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use crate::app::{App, CascadeReport};
use crate::cli::{
    Cli, Command, GoalAdd, GoalCommand, GoalDone, GoalExport, GoalLink, GoalList, GoalLog,
    GoalOrderArg, GoalProgress, GoalRemove, GoalShow, GoalUndone, GoalUnlink, GoalUpdate,
    ProgressModeArg, TaskAdd, TaskCommand, TaskDone, TaskList, TaskOrderArg, TaskRemove, TaskShow,
    TaskStatusArg, TaskUndone, TaskUpdate,
};
use crate::entities::{goal, progress_entry, task};
use crate::error::AppError;
use crate::model::{
    GoalChanges, GoalInput, GoalOrder, GoalQuery, ParentUpdate, ProgressMode, TaskChanges,
    TaskOrder, TaskQuery,
};
use crate::progress::GoalView;
use crate::util::{
    format_datetime, format_delta, format_goal_detail, format_goal_markdown, format_percent,
    format_task_detail, format_value, status_word,
};

const DATA_DIR_FLAG: &str = "--data-dir";
const DATA_DIR_ENV: &str = "STRIDE_HOME";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let Cli { data_dir, command } = Cli::parse();
    let data_dir = resolve_data_dir(data_dir)?;
    let db_path = db::resolve_db_path(&data_dir);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    let app = App::new(db);

    match command {
        Command::Goal(command) => handle_goal(&app, command).await,
        Command::Task(command) => handle_task(&app, command).await,
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(path) = flag {
        let value = path.as_os_str().to_string_lossy();
        if value.trim().is_empty() {
            return Err(AppError::InvalidInput(format!("{DATA_DIR_FLAG} is empty")));
        }
        return Ok(path);
    }
    if let Ok(value) = std::env::var(DATA_DIR_ENV) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home).join(".stride"));
        }
    }
    Err(AppError::InvalidInput(format!(
        "unable to resolve data directory; pass {DATA_DIR_FLAG} or set {DATA_DIR_ENV}"
    )))
}

async fn handle_goal(app: &App, command: GoalCommand) -> Result<(), AppError> {
    match command {
        GoalCommand::Add(args) => handle_goal_add(app, args).await,
        GoalCommand::List(args) => handle_goal_list(app, args).await,
        GoalCommand::Show(args) => handle_goal_show(app, args).await,
        GoalCommand::Update(args) => handle_goal_update(app, args).await,
        GoalCommand::Done(args) => handle_goal_done(app, args).await,
        GoalCommand::Undone(args) => handle_goal_undone(app, args).await,
        GoalCommand::Progress(args) => handle_goal_progress(app, args).await,
        GoalCommand::Log(args) => handle_goal_log(app, args).await,
        GoalCommand::Link(args) => handle_goal_link(app, args).await,
        GoalCommand::Unlink(args) => handle_goal_unlink(app, args).await,
        GoalCommand::Export(args) => handle_goal_export(app, args).await,
        GoalCommand::Remove(args) => handle_goal_remove(app, args).await,
    }
}

async fn handle_task(app: &App, command: TaskCommand) -> Result<(), AppError> {
    match command {
        TaskCommand::Add(args) => handle_task_add(app, args).await,
        TaskCommand::List(args) => handle_task_list(app, args).await,
        TaskCommand::Show(args) => handle_task_show(app, args).await,
        TaskCommand::Update(args) => handle_task_update(app, args).await,
        TaskCommand::Done(args) => handle_task_done(app, args).await,
        TaskCommand::Undone(args) => handle_task_undone(app, args).await,
        TaskCommand::Remove(args) => handle_task_remove(app, args).await,
    }
}

async fn handle_goal_add(app: &App, args: GoalAdd) -> Result<(), AppError> {
    require_non_empty("goal title", &args.title)?;
    let goal = app
        .add_goal(GoalInput {
            title: args.title,
            mode: progress_mode_from_arg(args.mode),
            target_value: args.target,
            parent_id: args.parent,
        })
        .await?;

    println!("Created goal ID: {}: {}", goal.id, goal.title);
    Ok(())
}

async fn handle_goal_list(app: &App, args: GoalList) -> Result<(), AppError> {
    let query = GoalQuery {
        mode: args.mode.map(progress_mode_from_arg),
        include_completed: args.all,
        parent_id: args.parent,
        order: args.order.map(goal_order_from_arg),
        desc: args.desc,
        limit: args.limit,
        offset: args.offset,
    };

    if args.count {
        let total = app.count_goals(&query).await?;
        println!("Total: {}", total);
        return Ok(());
    }

    let goals = app.list_goals(&query).await?;
    if goals.is_empty() {
        println!("No goals found.");
        return Ok(());
    }

    let views = app.goal_views_for(goals).await?;
    print_goal_list(&views);
    Ok(())
}

async fn handle_goal_show(app: &App, args: GoalShow) -> Result<(), AppError> {
    let detail = app.goal_detail(args.id).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&detail.view)?);
        return Ok(());
    }
    println!(
        "{}",
        format_goal_detail(&detail.view, &detail.tasks, &detail.children)
    );
    Ok(())
}

async fn handle_goal_update(app: &App, args: GoalUpdate) -> Result<(), AppError> {
    if let Some(title) = &args.title {
        require_non_empty("goal title", title)?;
    }
    let parent = if args.detach_parent {
        Some(ParentUpdate::Detach)
    } else {
        args.parent.map(ParentUpdate::Assign)
    };
    let goal = app
        .update_goal(
            args.id,
            GoalChanges {
                title: args.title,
                mode: args.mode.map(progress_mode_from_arg),
                target_value: args.target,
                parent,
            },
        )
        .await?;

    println!("Updated goal ID: {}: {}", goal.id, goal.title);
    Ok(())
}

async fn handle_goal_done(app: &App, args: GoalDone) -> Result<(), AppError> {
    let (outcome, report) = app.complete_goal(args.id).await?;
    if !outcome.success {
        return Err(AppError::NotFound(format!("goal id {}", args.id)));
    }
    println!("{}", outcome.message);
    if let Some(goal) = &outcome.goal {
        print_goal_status(goal);
    }
    print_cascade_report(&report);
    Ok(())
}

async fn handle_goal_undone(app: &App, args: GoalUndone) -> Result<(), AppError> {
    let (outcome, report) = app.uncomplete_goal(args.id).await?;
    if !outcome.success {
        return Err(AppError::NotFound(format!("goal id {}", args.id)));
    }
    println!("{}", outcome.message);
    if let Some(goal) = &outcome.goal {
        print_goal_status(goal);
    }
    print_cascade_report(&report);
    Ok(())
}

async fn handle_goal_progress(app: &App, args: GoalProgress) -> Result<(), AppError> {
    if let Some(note) = &args.note {
        require_non_empty("progress note", note)?;
    }
    let (goal, change) = app.submit_progress(args.id, args.delta, args.note).await?;
    println!(
        "Goal ID: {} progress {} (now {}).",
        goal.id,
        format_delta(change.delta),
        format_value(goal.current_value)
    );
    Ok(())
}

async fn handle_goal_log(app: &App, args: GoalLog) -> Result<(), AppError> {
    let entries = app.list_entries(args.id, args.limit).await?;
    if entries.is_empty() {
        println!("No progress entries found for goal ID: {}.", args.id);
        return Ok(());
    }
    print_entry_list(&entries);
    Ok(())
}

async fn handle_goal_link(app: &App, args: GoalLink) -> Result<(), AppError> {
    let link = app.link_task(args.goal_id, args.task_id).await?;
    println!(
        "Linked task ID: {} to goal ID: {}",
        link.task_id, link.goal_id
    );
    Ok(())
}

async fn handle_goal_unlink(app: &App, args: GoalUnlink) -> Result<(), AppError> {
    app.unlink_task(args.goal_id, args.task_id).await?;
    println!(
        "Unlinked task ID: {} from goal ID: {}",
        args.task_id, args.goal_id
    );
    Ok(())
}

async fn handle_goal_export(app: &App, args: GoalExport) -> Result<(), AppError> {
    let detail = app.goal_detail(args.id).await?;
    let entries = app.list_entries(args.id, None).await?;
    db::ensure_parent_dir(&args.path)?;
    let markdown = format_goal_markdown(&detail.view, &detail.tasks, &detail.children, &entries);
    fs::write(&args.path, markdown)?;
    println!(
        "Exported goal ID: {} to {}",
        detail.view.goal.id,
        args.path.display()
    );
    Ok(())
}

async fn handle_goal_remove(app: &App, args: GoalRemove) -> Result<(), AppError> {
    app.delete_goal(args.id).await?;
    println!("Goal ID: {} removed.", args.id);
    Ok(())
}

async fn handle_task_add(app: &App, args: TaskAdd) -> Result<(), AppError> {
    if args.titles.is_empty() {
        return Err(AppError::InvalidInput("no titles provided".to_string()));
    }
    for title in &args.titles {
        require_non_empty("task title", title)?;
    }
    let tasks = app
        .add_tasks(args.titles, args.size, args.parent, args.goal)
        .await?;
    match (tasks.len(), args.goal) {
        (1, Some(goal_id)) => println!(
            "Created task ID: {}: {} (goal ID: {})",
            tasks[0].id, tasks[0].title, goal_id
        ),
        (1, None) => println!("Created task ID: {}: {}", tasks[0].id, tasks[0].title),
        (count, Some(goal_id)) => println!("Created {count} tasks for goal ID: {goal_id}"),
        (count, None) => println!("Created {count} tasks."),
    }
    Ok(())
}

async fn handle_task_list(app: &App, args: TaskList) -> Result<(), AppError> {
    let completed = if args.all {
        None
    } else if let Some(status) = args.status {
        Some(matches!(status, TaskStatusArg::Done))
    } else {
        Some(false)
    };

    let query = TaskQuery {
        completed,
        goal_id: args.goal,
        order: args.order.map(task_order_from_arg),
        desc: args.desc,
        limit: args.limit,
        offset: args.offset,
    };

    if args.count {
        let total = app.count_tasks(&query).await?;
        println!("Total: {}", total);
        return Ok(());
    }

    let tasks = app.list_tasks(&query).await?;
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    print_task_list(&tasks);
    Ok(())
}

async fn handle_task_show(app: &App, args: TaskShow) -> Result<(), AppError> {
    let detail = app.task_detail(args.id).await?;
    println!("{}", format_task_detail(&detail.task, &detail.goals));
    Ok(())
}

async fn handle_task_update(app: &App, args: TaskUpdate) -> Result<(), AppError> {
    if let Some(title) = &args.title {
        require_non_empty("task title", title)?;
    }
    let parent = if args.detach_parent {
        Some(ParentUpdate::Detach)
    } else {
        args.parent.map(ParentUpdate::Assign)
    };
    let task = app
        .update_task(
            args.id,
            TaskChanges {
                title: args.title,
                size: args.size,
                parent,
            },
        )
        .await?;

    println!("Updated task ID: {}: {}", task.id, task.title);
    Ok(())
}

async fn handle_task_done(app: &App, args: TaskDone) -> Result<(), AppError> {
    if args.ids.is_empty() {
        return Err(AppError::InvalidInput("no task ids provided".to_string()));
    }
    let (tasks, report) = app.set_tasks_done(&args.ids).await?;
    if tasks.len() == 1 {
        println!("Task ID: {} marked done.", tasks[0].id);
    } else {
        println!("Marked {} tasks done.", tasks.len());
    }
    print_cascade_report(&report);
    Ok(())
}

async fn handle_task_undone(app: &App, args: TaskUndone) -> Result<(), AppError> {
    if args.ids.is_empty() {
        return Err(AppError::InvalidInput("no task ids provided".to_string()));
    }
    let (tasks, report) = app.set_tasks_undone(&args.ids).await?;
    if tasks.len() == 1 {
        println!("Task ID: {} marked open.", tasks[0].id);
    } else {
        println!("Marked {} tasks open.", tasks.len());
    }
    print_cascade_report(&report);
    Ok(())
}

async fn handle_task_remove(app: &App, args: TaskRemove) -> Result<(), AppError> {
    if args.ids.is_empty() {
        return Err(AppError::InvalidInput("no task ids provided".to_string()));
    }
    let deleted = app.delete_tasks(&args.ids).await?;
    if args.ids.len() == 1 {
        println!("Task ID: {} removed.", args.ids[0]);
    } else {
        println!("Removed {} tasks.", deleted);
    }
    Ok(())
}

fn progress_mode_from_arg(arg: ProgressModeArg) -> ProgressMode {
    match arg {
        ProgressModeArg::Manual => ProgressMode::ManualTotal,
        ProgressModeArg::Tasks => ProgressMode::TaskBased,
        ProgressModeArg::Habit => ProgressMode::Habit,
    }
}

fn goal_order_from_arg(arg: GoalOrderArg) -> GoalOrder {
    match arg {
        GoalOrderArg::Id => GoalOrder::Id,
        GoalOrderArg::Title => GoalOrder::Title,
        GoalOrderArg::Created => GoalOrder::Created,
        GoalOrderArg::Updated => GoalOrder::Updated,
    }
}

fn task_order_from_arg(arg: TaskOrderArg) -> TaskOrder {
    match arg {
        TaskOrderArg::Id => TaskOrder::Id,
        TaskOrderArg::Title => TaskOrder::Title,
        TaskOrderArg::Created => TaskOrder::Created,
    }
}

fn require_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(())
}

fn print_cascade_report(report: &CascadeReport) {
    if report.is_empty() {
        return;
    }

    println!("Progress updates:");
    for change in &report.goals {
        println!(
            "- Goal ID: {} progress {} (now {}, {}).",
            change.goal_id,
            format_delta(change.delta),
            format_value(change.value),
            change.reason
        );
    }
    for change in &report.parents {
        println!(
            "- Parent goal ID: {} progress {} (now {}, {}).",
            change.goal_id,
            format_delta(change.delta),
            format_value(change.value),
            change.reason
        );
    }
}

fn print_goal_status(goal: &goal::Model) {
    println!(
        "- [{}] {} (goal id {})",
        status_word(goal.marked_complete),
        goal.title,
        goal.id
    );
}

fn print_goal_list(views: &[GoalView]) {
    println!(
        "{:<4} {:<7} {:<5} {:<7} {:<7} {:<30} {}",
        "ID", "MODE", "STAT", "PROG", "TASKS", "TITLE", "VALUE"
    );
    for view in views {
        let goal = &view.goal;
        let totals = &view.progress.tasks;
        let value = match goal.target_value {
            Some(target) => format!(
                "{}/{}",
                format_value(goal.current_value),
                format_value(target)
            ),
            None => format_value(goal.current_value),
        };
        println!(
            "{:<4} {:<7} {:<5} {:<7} {:<7} {:<30} {}",
            goal.id,
            goal.progress_mode,
            status_word(goal.marked_complete),
            format_percent(view.progress.percent_complete),
            format!("{}/{}", totals.completed_count, totals.count),
            goal.title,
            value
        );
    }
}

fn print_task_list(tasks: &[task::Model]) {
    println!("{:<4} {:<5} {:<5} {}", "ID", "STAT", "SIZE", "TITLE");
    for task in tasks {
        println!(
            "{:<4} {:<5} {:<5} {}",
            task.id,
            status_word(task.completed),
            task.size,
            task.title
        );
    }
}

fn print_entry_list(entries: &[progress_entry::Model]) {
    println!("{:<4} {:<7} {:<17} {}", "ID", "DELTA", "WHEN", "NOTE");
    for entry in entries {
        println!(
            "{:<4} {:<7} {:<17} {}",
            entry.id,
            format_delta(entry.delta),
            format_datetime(entry.created_at),
            entry.note
        );
    }
}
