use serde::Serialize;

use crate::entities::{goal, task};
use crate::model::ProgressMode;

pub fn effective_size(task: &task::Model) -> i64 {
    if task.size > 0 {
        i64::from(task.size)
    } else {
        1
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TaskTotals {
    pub count: usize,
    pub completed_count: usize,
    pub total_size: i64,
    pub completed_size: i64,
}

impl TaskTotals {
    pub fn accumulate(&mut self, tasks: &[task::Model]) {
        for task in tasks {
            let size = effective_size(task);
            self.count += 1;
            self.total_size += size;
            if task.completed {
                self.completed_count += 1;
                self.completed_size += size;
            }
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        self.completed_size as f64 / self.total_size as f64 * 100.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ManualTotals {
    pub current_value: f64,
    pub target_value: Option<f64>,
}

pub fn manual_percent(current_value: f64, target_value: Option<f64>) -> f64 {
    match target_value {
        Some(target) if target != 0.0 => (current_value / target * 100.0).min(100.0),
        _ => 0.0,
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProgressSummary {
    pub mode: ProgressMode,
    pub percent_complete: f64,
    pub tasks: TaskTotals,
    pub manual: ManualTotals,
}

#[derive(Clone, Debug, Serialize)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: goal::Model,
    pub progress: ProgressSummary,
}

pub fn summarize(
    goal: &goal::Model,
    mode: ProgressMode,
    own_tasks: &[task::Model],
    child_tasks: &[task::Model],
) -> ProgressSummary {
    let mut totals = TaskTotals::default();
    totals.accumulate(own_tasks);
    if mode == ProgressMode::TaskBased {
        totals.accumulate(child_tasks);
    }
    let percent_complete = match mode {
        ProgressMode::TaskBased => totals.percent(),
        ProgressMode::ManualTotal => manual_percent(goal.current_value, goal.target_value),
        ProgressMode::Habit => manual_percent(goal.current_value, goal.target_value),
    };
    ProgressSummary {
        mode,
        percent_complete,
        tasks: totals,
        manual: ManualTotals {
            current_value: goal.current_value,
            target_value: goal.target_value,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn goal_model(mode: ProgressMode, current_value: f64, target_value: Option<f64>) -> goal::Model {
        goal::Model {
            id: 1,
            title: "Goal".to_string(),
            progress_mode: mode.as_str().to_string(),
            target_value,
            current_value,
            marked_complete: false,
            parent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn task_model(id: i64, size: i32, completed: bool) -> task::Model {
        task::Model {
            id,
            title: format!("Task {id}"),
            size,
            completed,
            parent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn task_percent_without_tasks_is_zero() {
        let goal = goal_model(ProgressMode::TaskBased, 0.0, None);
        let summary = summarize(&goal, ProgressMode::TaskBased, &[], &[]);
        assert_eq!(summary.percent_complete, 0.0);
        assert_eq!(summary.tasks.count, 0);
    }

    #[test]
    fn task_percent_weights_by_size() {
        let goal = goal_model(ProgressMode::TaskBased, 0.0, None);
        let tasks = vec![task_model(1, 2, true), task_model(2, 3, false)];
        let summary = summarize(&goal, ProgressMode::TaskBased, &tasks, &[]);
        assert_eq!(summary.percent_complete, 40.0);
        assert_eq!(summary.tasks.completed_size, 2);
        assert_eq!(summary.tasks.total_size, 5);
    }

    #[test]
    fn non_positive_size_counts_as_one() {
        let tasks = vec![task_model(1, 0, true), task_model(2, -2, false)];
        let mut totals = TaskTotals::default();
        totals.accumulate(&tasks);
        assert_eq!(totals.total_size, 2);
        assert_eq!(totals.completed_size, 1);
        assert_eq!(totals.percent(), 50.0);
    }

    #[test]
    fn manual_percent_caps_at_hundred() {
        assert_eq!(manual_percent(75.0, Some(50.0)), 100.0);
        assert_eq!(manual_percent(25.0, Some(50.0)), 50.0);
    }

    #[test]
    fn manual_percent_without_target_is_zero() {
        assert_eq!(manual_percent(5.0, None), 0.0);
        assert_eq!(manual_percent(5.0, Some(0.0)), 0.0);
    }

    #[test]
    fn habit_percent_tracks_current_over_target() {
        let goal = goal_model(ProgressMode::Habit, 3.0, Some(10.0));
        let summary = summarize(&goal, ProgressMode::Habit, &[], &[]);
        assert_eq!(summary.percent_complete, 30.0);
        assert_eq!(summary.manual.current_value, 3.0);
        assert_eq!(summary.manual.target_value, Some(10.0));
    }

    #[test]
    fn child_tasks_roll_up_for_task_based_goals() {
        let goal = goal_model(ProgressMode::TaskBased, 0.0, None);
        let own = vec![task_model(1, 1, true)];
        let children = vec![task_model(2, 3, false)];
        let summary = summarize(&goal, ProgressMode::TaskBased, &own, &children);
        assert_eq!(summary.percent_complete, 25.0);
        assert_eq!(summary.tasks.count, 2);
        assert_eq!(summary.tasks.total_size, 4);
    }

    #[test]
    fn child_tasks_ignored_for_manual_goals() {
        let goal = goal_model(ProgressMode::ManualTotal, 4.0, Some(8.0));
        let children = vec![task_model(2, 3, false)];
        let summary = summarize(&goal, ProgressMode::ManualTotal, &[], &children);
        assert_eq!(summary.percent_complete, 50.0);
        assert_eq!(summary.tasks.count, 0);
    }
}
