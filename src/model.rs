use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ProgressMode {
    #[serde(rename = "manual")]
    ManualTotal,
    #[serde(rename = "tasks")]
    TaskBased,
    #[serde(rename = "habit")]
    Habit,
}

impl ProgressMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManualTotal => "manual",
            Self::TaskBased => "tasks",
            Self::Habit => "habit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Self::ManualTotal),
            "tasks" => Some(Self::TaskBased),
            "habit" => Some(Self::Habit),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ParentUpdate {
    Assign(i64),
    Detach,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalInput {
    pub title: String,
    pub mode: ProgressMode,
    pub target_value: Option<f64>,
    pub parent_id: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GoalChanges {
    pub title: Option<String>,
    pub mode: Option<ProgressMode>,
    pub target_value: Option<f64>,
    pub parent: Option<ParentUpdate>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub size: Option<i32>,
    pub parent: Option<ParentUpdate>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GoalQuery {
    pub mode: Option<ProgressMode>,
    pub include_completed: bool,
    pub parent_id: Option<i64>,
    pub order: Option<GoalOrder>,
    pub desc: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub completed: Option<bool>,
    pub goal_id: Option<i64>,
    pub order: Option<TaskOrder>,
    pub desc: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum GoalOrder {
    Id,
    Title,
    Created,
    Updated,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum TaskOrder {
    Id,
    Title,
    Created,
}
