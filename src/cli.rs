use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "stride",
    version,
    about = "Track goals and tasks with SQLite"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Data directory (defaults to $STRIDE_HOME or ~/.stride)"
    )]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Goal(GoalCommand),
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add(GoalAdd),
    List(GoalList),
    Show(GoalShow),
    Update(GoalUpdate),
    Done(GoalDone),
    Undone(GoalUndone),
    Progress(GoalProgress),
    Log(GoalLog),
    Link(GoalLink),
    Unlink(GoalUnlink),
    Export(GoalExport),
    Remove(GoalRemove),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    Add(TaskAdd),
    List(TaskList),
    Show(TaskShow),
    Update(TaskUpdate),
    Done(TaskDone),
    Undone(TaskUndone),
    Remove(TaskRemove),
}

#[derive(Args, Debug)]
pub struct GoalAdd {
    pub title: String,
    #[arg(long, value_enum, default_value = "tasks")]
    pub mode: ProgressModeArg,
    #[arg(long, value_name = "VALUE")]
    pub target: Option<f64>,
    #[arg(long, value_name = "ID")]
    pub parent: Option<i64>,
}

#[derive(Args, Debug)]
pub struct GoalList {
    #[arg(long, help = "Include completed goals")]
    pub all: bool,
    #[arg(long, value_enum)]
    pub mode: Option<ProgressModeArg>,
    #[arg(long, value_name = "ID")]
    pub parent: Option<i64>,
    #[arg(long, value_enum)]
    pub order: Option<GoalOrderArg>,
    #[arg(long)]
    pub desc: bool,
    #[arg(long)]
    pub limit: Option<u64>,
    #[arg(long)]
    pub offset: Option<u64>,
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug)]
pub struct GoalShow {
    pub id: i64,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GoalUpdate {
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, value_enum)]
    pub mode: Option<ProgressModeArg>,
    #[arg(long, value_name = "VALUE")]
    pub target: Option<f64>,
    #[arg(long, value_name = "ID", conflicts_with = "detach_parent")]
    pub parent: Option<i64>,
    #[arg(long)]
    pub detach_parent: bool,
}

#[derive(Args, Debug)]
pub struct GoalDone {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct GoalUndone {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct GoalProgress {
    pub id: i64,
    #[arg(value_name = "DELTA", allow_hyphen_values = true)]
    pub delta: f64,
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Args, Debug)]
pub struct GoalLog {
    pub id: i64,
    #[arg(long)]
    pub limit: Option<u64>,
}

#[derive(Args, Debug)]
pub struct GoalLink {
    pub goal_id: i64,
    pub task_id: i64,
}

#[derive(Args, Debug)]
pub struct GoalUnlink {
    pub goal_id: i64,
    pub task_id: i64,
}

#[derive(Args, Debug)]
pub struct GoalExport {
    pub id: i64,
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct GoalRemove {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct TaskAdd {
    #[arg(value_name = "TITLE", num_args = 1..)]
    pub titles: Vec<String>,
    #[arg(long, value_name = "ID", help = "Link the new tasks to a goal")]
    pub goal: Option<i64>,
    #[arg(long, default_value_t = 1)]
    pub size: i32,
    #[arg(long, value_name = "ID")]
    pub parent: Option<i64>,
}

#[derive(Args, Debug)]
pub struct TaskList {
    #[arg(long, value_name = "ID")]
    pub goal: Option<i64>,
    #[arg(long, help = "Include completed tasks")]
    pub all: bool,
    #[arg(long, value_enum)]
    pub status: Option<TaskStatusArg>,
    #[arg(long, value_enum)]
    pub order: Option<TaskOrderArg>,
    #[arg(long)]
    pub desc: bool,
    #[arg(long)]
    pub limit: Option<u64>,
    #[arg(long)]
    pub offset: Option<u64>,
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug)]
pub struct TaskShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct TaskUpdate {
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub size: Option<i32>,
    #[arg(long, value_name = "ID", conflicts_with = "detach_parent")]
    pub parent: Option<i64>,
    #[arg(long)]
    pub detach_parent: bool,
}

#[derive(Args, Debug)]
pub struct TaskDone {
    #[arg(value_name = "ID", num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct TaskUndone {
    #[arg(value_name = "ID", num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct TaskRemove {
    #[arg(value_name = "ID", num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum ProgressModeArg {
    Manual,
    Tasks,
    Habit,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum TaskStatusArg {
    Open,
    Done,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum GoalOrderArg {
    Id,
    Title,
    Created,
    Updated,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum TaskOrderArg {
    Id,
    Title,
    Created,
}
