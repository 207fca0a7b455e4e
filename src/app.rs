use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::{goal, goal_task, progress_entry, task};
use crate::error::AppError;
use crate::model::{
    GoalChanges, GoalInput, GoalOrder, GoalQuery, ParentUpdate, ProgressMode, TaskChanges,
    TaskOrder, TaskQuery,
};
use crate::progress::{self, GoalView, TaskTotals};

pub struct App {
    db: DatabaseConnection,
}

pub struct GoalDetail {
    pub view: GoalView,
    pub tasks: Vec<task::Model>,
    pub children: Vec<GoalView>,
}

pub struct TaskDetail {
    pub task: task::Model,
    pub goals: Vec<goal::Model>,
}

#[derive(Clone, Debug)]
pub struct CompletionOutcome {
    pub success: bool,
    pub message: String,
    pub goal: Option<goal::Model>,
}

#[derive(Clone, Debug)]
pub struct ValueChange {
    pub goal_id: i64,
    pub delta: f64,
    pub value: f64,
    pub reason: String,
}

#[derive(Default, Debug)]
pub struct CascadeReport {
    pub goals: Vec<ValueChange>,
    pub parents: Vec<ValueChange>,
}

impl CascadeReport {
    pub fn merge(&mut self, other: CascadeReport) {
        self.goals.extend(other.goals);
        self.parents.extend(other.parents);
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty() && self.parents.is_empty()
    }
}

impl App {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn add_goal(&self, input: GoalInput) -> Result<goal::Model, AppError> {
        ensure_non_empty("goal title", &input.title)?;
        if let Some(target) = input.target_value {
            ensure_positive_target(target)?;
        }
        if let Some(parent_id) = input.parent_id {
            goal::Entity::find_by_id(parent_id)
                .one(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("goal id {parent_id}")))?;
        }

        let now = Utc::now();
        let active = goal::ActiveModel {
            title: Set(input.title),
            progress_mode: Set(input.mode.as_str().to_string()),
            target_value: Set(input.target_value),
            current_value: Set(0.0),
            marked_complete: Set(false),
            parent_id: Set(input.parent_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let insert = goal::Entity::insert(active).exec(&self.db).await?;
        let created = goal::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?;
        created.ok_or_else(|| AppError::NotFound("goal not found after insert".to_string()))
    }

    pub async fn list_goals(&self, query: &GoalQuery) -> Result<Vec<goal::Model>, AppError> {
        let mut select = goal::Entity::find();
        if let Some(mode) = query.mode {
            select = select.filter(goal::Column::ProgressMode.eq(mode.as_str()));
        }
        if !query.include_completed {
            select = select.filter(goal::Column::MarkedComplete.eq(false));
        }
        if let Some(parent_id) = query.parent_id {
            select = select.filter(goal::Column::ParentId.eq(parent_id));
        }
        let order = query.order.unwrap_or(GoalOrder::Id);
        match (order, query.desc) {
            (GoalOrder::Id, true) => select = select.order_by_desc(goal::Column::Id),
            (GoalOrder::Id, false) => select = select.order_by_asc(goal::Column::Id),
            (GoalOrder::Title, true) => select = select.order_by_desc(goal::Column::Title),
            (GoalOrder::Title, false) => select = select.order_by_asc(goal::Column::Title),
            (GoalOrder::Created, true) => select = select.order_by_desc(goal::Column::CreatedAt),
            (GoalOrder::Created, false) => select = select.order_by_asc(goal::Column::CreatedAt),
            (GoalOrder::Updated, true) => select = select.order_by_desc(goal::Column::UpdatedAt),
            (GoalOrder::Updated, false) => select = select.order_by_asc(goal::Column::UpdatedAt),
        }
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }
        if let Some(offset) = query.offset {
            select = select.offset(offset);
        }
        Ok(select.order_by_asc(goal::Column::Id).all(&self.db).await?)
    }

    pub async fn count_goals(&self, query: &GoalQuery) -> Result<u64, AppError> {
        let mut select = goal::Entity::find();
        if let Some(mode) = query.mode {
            select = select.filter(goal::Column::ProgressMode.eq(mode.as_str()));
        }
        if !query.include_completed {
            select = select.filter(goal::Column::MarkedComplete.eq(false));
        }
        if let Some(parent_id) = query.parent_id {
            select = select.filter(goal::Column::ParentId.eq(parent_id));
        }
        Ok(select.count(&self.db).await?)
    }

    pub async fn get_goal(&self, id: i64) -> Result<goal::Model, AppError> {
        goal::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))
    }

    pub async fn get_task(&self, id: i64) -> Result<task::Model, AppError> {
        task::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task id {id}")))
    }

    pub async fn goal_view(&self, id: i64) -> Result<GoalView, AppError> {
        let goal = self.get_goal(id).await?;
        let mut views = self.goal_views_for(vec![goal]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::NotFound("goal view missing".to_string()))
    }

    pub async fn goal_views_for(&self, goals: Vec<goal::Model>) -> Result<Vec<GoalView>, AppError> {
        if goals.is_empty() {
            return Ok(Vec::new());
        }
        let goal_ids: Vec<i64> = goals.iter().map(|goal| goal.id).collect();
        let mut own_tasks = self.tasks_by_goal_with_conn(&self.db, &goal_ids).await?;
        let mut child_tasks = self.child_task_map_with_conn(&self.db, &goal_ids).await?;

        let mut views = Vec::with_capacity(goals.len());
        for goal in goals {
            let mode = goal_mode(&goal)?;
            let own = own_tasks.remove(&goal.id).unwrap_or_default();
            let children = child_tasks.remove(&goal.id).unwrap_or_default();
            let progress = progress::summarize(&goal, mode, &own, &children);
            views.push(GoalView { goal, progress });
        }
        Ok(views)
    }

    pub async fn goal_detail(&self, id: i64) -> Result<GoalDetail, AppError> {
        let view = self.goal_view(id).await?;
        let tasks = self.tasks_for_goal(id).await?;
        let children = goal::Entity::find()
            .filter(goal::Column::ParentId.eq(id))
            .order_by_asc(goal::Column::Id)
            .all(&self.db)
            .await?;
        let children = self.goal_views_for(children).await?;
        Ok(GoalDetail {
            view,
            tasks,
            children,
        })
    }

    pub async fn task_detail(&self, id: i64) -> Result<TaskDetail, AppError> {
        let task = self.get_task(id).await?;
        let goals = self.goals_for_task_with_conn(&self.db, id).await?;
        Ok(TaskDetail { task, goals })
    }

    pub async fn tasks_for_goal(&self, goal_id: i64) -> Result<Vec<task::Model>, AppError> {
        self.tasks_for_goal_with_conn(&self.db, goal_id).await
    }

    async fn tasks_for_goal_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        goal_id: i64,
    ) -> Result<Vec<task::Model>, AppError> {
        let mut grouped = self.tasks_by_goal_with_conn(db, &[goal_id]).await?;
        Ok(grouped.remove(&goal_id).unwrap_or_default())
    }

    async fn tasks_by_goal_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        goal_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<task::Model>>, AppError> {
        let mut grouped = HashMap::new();
        if goal_ids.is_empty() {
            return Ok(grouped);
        }

        let links = goal_task::Entity::find()
            .filter(goal_task::Column::GoalId.is_in(goal_ids.to_vec()))
            .order_by_asc(goal_task::Column::GoalId)
            .order_by_asc(goal_task::Column::Id)
            .all(db)
            .await?;
        if links.is_empty() {
            return Ok(grouped);
        }

        let mut seen = HashSet::new();
        let mut task_ids = Vec::new();
        for link in &links {
            if seen.insert(link.task_id) {
                task_ids.push(link.task_id);
            }
        }
        let tasks = task::Entity::find()
            .filter(task::Column::Id.is_in(task_ids))
            .all(db)
            .await?;
        let by_id: HashMap<i64, task::Model> =
            tasks.into_iter().map(|task| (task.id, task)).collect();

        for link in links {
            if let Some(task) = by_id.get(&link.task_id) {
                grouped
                    .entry(link.goal_id)
                    .or_insert_with(Vec::new)
                    .push(task.clone());
            }
        }

        Ok(grouped)
    }

    async fn goals_for_task_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        task_id: i64,
    ) -> Result<Vec<goal::Model>, AppError> {
        let links = goal_task::Entity::find()
            .filter(goal_task::Column::TaskId.eq(task_id))
            .order_by_asc(goal_task::Column::Id)
            .all(db)
            .await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }
        let goal_ids: Vec<i64> = links.iter().map(|link| link.goal_id).collect();
        let goals = goal::Entity::find()
            .filter(goal::Column::Id.is_in(goal_ids.clone()))
            .all(db)
            .await?;
        let mut by_id: HashMap<i64, goal::Model> =
            goals.into_iter().map(|goal| (goal.id, goal)).collect();
        let mut ordered = Vec::with_capacity(goal_ids.len());
        for goal_id in goal_ids {
            if let Some(goal) = by_id.remove(&goal_id) {
                ordered.push(goal);
            }
        }
        Ok(ordered)
    }

    async fn child_task_map_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        parent_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<task::Model>>, AppError> {
        let mut grouped: HashMap<i64, Vec<task::Model>> = HashMap::new();
        if parent_ids.is_empty() {
            return Ok(grouped);
        }
        let children = goal::Entity::find()
            .filter(goal::Column::ParentId.is_in(parent_ids.to_vec()))
            .order_by_asc(goal::Column::Id)
            .all(db)
            .await?;
        if children.is_empty() {
            return Ok(grouped);
        }
        let child_ids: Vec<i64> = children.iter().map(|child| child.id).collect();
        let mut child_tasks = self.tasks_by_goal_with_conn(db, &child_ids).await?;
        for child in &children {
            let Some(parent_id) = child.parent_id else {
                continue;
            };
            let tasks = child_tasks.remove(&child.id).unwrap_or_default();
            grouped.entry(parent_id).or_default().extend(tasks);
        }
        Ok(grouped)
    }

    pub async fn update_goal(
        &self,
        id: i64,
        changes: GoalChanges,
    ) -> Result<goal::Model, AppError> {
        let txn = self.db.begin().await?;
        let result = self.update_goal_with_conn(&txn, id, changes).await;
        finalize_transaction(txn, result).await
    }

    async fn update_goal_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
        changes: GoalChanges,
    ) -> Result<goal::Model, AppError> {
        if let Some(title) = changes.title.as_deref() {
            ensure_non_empty("goal title", title)?;
        }
        if let Some(target) = changes.target_value {
            ensure_positive_target(target)?;
        }
        if let Some(ParentUpdate::Assign(parent_id)) = changes.parent {
            self.ensure_goal_parent_valid_with_conn(db, id, parent_id)
                .await?;
        }

        let mut active = goal::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(mode) = changes.mode {
            active.progress_mode = Set(mode.as_str().to_string());
        }
        if let Some(target) = changes.target_value {
            active.target_value = Set(Some(target));
        }
        match changes.parent {
            Some(ParentUpdate::Assign(parent_id)) => active.parent_id = Set(Some(parent_id)),
            Some(ParentUpdate::Detach) => active.parent_id = Set(None),
            None => {}
        }
        active.updated_at = Set(Utc::now());

        match active.update(db).await {
            Ok(model) => Ok(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("goal id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_goal_parent_valid_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
        parent_id: i64,
    ) -> Result<(), AppError> {
        if parent_id == id {
            return Err(AppError::InvalidInput(
                "goal cannot be its own parent".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        let mut cursor = Some(parent_id);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                break;
            }
            let goal = goal::Entity::find_by_id(current)
                .one(db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("goal id {current}")))?;
            if goal.id == id {
                return Err(AppError::InvalidInput(format!(
                    "goal id {parent_id} is a descendant of goal id {id}"
                )));
            }
            cursor = goal.parent_id;
        }
        Ok(())
    }

    pub async fn delete_goal(&self, id: i64) -> Result<(), AppError> {
        let txn = self.db.begin().await?;
        progress_entry::Entity::delete_many()
            .filter(progress_entry::Column::GoalId.eq(id))
            .exec(&txn)
            .await?;
        goal_task::Entity::delete_many()
            .filter(goal_task::Column::GoalId.eq(id))
            .exec(&txn)
            .await?;
        let children = goal::Entity::find()
            .filter(goal::Column::ParentId.eq(id))
            .all(&txn)
            .await?;
        let now = Utc::now();
        for child in children {
            let mut active: goal::ActiveModel = child.into();
            active.parent_id = Set(None);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        let result = goal::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::NotFound(format!("goal id {id}")));
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn complete_goal(
        &self,
        id: i64,
    ) -> Result<(CompletionOutcome, CascadeReport), AppError> {
        self.set_goal_completion(id, true).await
    }

    pub async fn uncomplete_goal(
        &self,
        id: i64,
    ) -> Result<(CompletionOutcome, CascadeReport), AppError> {
        self.set_goal_completion(id, false).await
    }

    async fn set_goal_completion(
        &self,
        id: i64,
        completed: bool,
    ) -> Result<(CompletionOutcome, CascadeReport), AppError> {
        let txn = self.db.begin().await?;
        let result: Result<(CompletionOutcome, CascadeReport), AppError> = async {
            let Some(goal) = goal::Entity::find_by_id(id).one(&txn).await? else {
                return Ok((
                    CompletionOutcome {
                        success: false,
                        message: "Goal not found".to_string(),
                        goal: None,
                    },
                    CascadeReport::default(),
                ));
            };

            if goal.marked_complete == completed {
                let message = if completed {
                    format!("Goal ID: {} already completed.", goal.id)
                } else {
                    format!("Goal ID: {} already incomplete.", goal.id)
                };
                return Ok((
                    CompletionOutcome {
                        success: true,
                        message,
                        goal: Some(goal),
                    },
                    CascadeReport::default(),
                ));
            }

            let mut active: goal::ActiveModel = goal.clone().into();
            active.marked_complete = Set(completed);
            active.updated_at = Set(Utc::now());
            let updated = active.update(&txn).await?;

            let mut report = CascadeReport::default();
            if let Some(parent_id) = updated.parent_id {
                let delta = if completed { 1.0 } else { -1.0 };
                let reason = if completed {
                    format!("child goal '{}' completed", updated.title)
                } else {
                    format!("child goal '{}' marked incomplete", updated.title)
                };
                if let Some(change) = self
                    .bump_parent_with_conn(&txn, parent_id, delta, &reason)
                    .await?
                {
                    report.parents.push(change);
                }
            }

            let message = if completed {
                format!("Goal ID: {} marked completed.", updated.id)
            } else {
                format!("Goal ID: {} marked incomplete.", updated.id)
            };
            Ok((
                CompletionOutcome {
                    success: true,
                    message,
                    goal: Some(updated),
                },
                report,
            ))
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn submit_progress(
        &self,
        id: i64,
        delta: f64,
        note: Option<String>,
    ) -> Result<(goal::Model, ValueChange), AppError> {
        if !delta.is_finite() || delta == 0.0 {
            return Err(AppError::InvalidInput(
                "progress delta must be a non-zero number".to_string(),
            ));
        }
        let note = match note {
            Some(note) => {
                ensure_non_empty("progress note", &note)?;
                note
            }
            None => "manual update".to_string(),
        };

        let txn = self.db.begin().await?;
        let result: Result<(goal::Model, ValueChange), AppError> = async {
            let goal = goal::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))?;
            self.adjust_goal_value_with_conn(&txn, &goal, delta, &note)
                .await
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn list_entries(
        &self,
        goal_id: i64,
        limit: Option<u64>,
    ) -> Result<Vec<progress_entry::Model>, AppError> {
        self.get_goal(goal_id).await?;
        let select =
            progress_entry::Entity::find().filter(progress_entry::Column::GoalId.eq(goal_id));
        match limit {
            Some(limit) => {
                let mut entries = select
                    .order_by_desc(progress_entry::Column::Id)
                    .limit(limit)
                    .all(&self.db)
                    .await?;
                entries.reverse();
                Ok(entries)
            }
            None => Ok(select
                .order_by_asc(progress_entry::Column::Id)
                .all(&self.db)
                .await?),
        }
    }

    pub async fn link_task(
        &self,
        goal_id: i64,
        task_id: i64,
    ) -> Result<goal_task::Model, AppError> {
        self.get_goal(goal_id).await?;
        self.get_task(task_id).await?;
        let existing = goal_task::Entity::find()
            .filter(goal_task::Column::GoalId.eq(goal_id))
            .filter(goal_task::Column::TaskId.eq(task_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::InvalidInput(format!(
                "task id {task_id} is already linked to goal id {goal_id}"
            )));
        }
        let active = goal_task::ActiveModel {
            goal_id: Set(goal_id),
            task_id: Set(task_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let insert = goal_task::Entity::insert(active).exec(&self.db).await?;
        let created = goal_task::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?;
        created.ok_or_else(|| AppError::NotFound("link not found after insert".to_string()))
    }

    pub async fn unlink_task(&self, goal_id: i64, task_id: i64) -> Result<(), AppError> {
        let result = goal_task::Entity::delete_many()
            .filter(goal_task::Column::GoalId.eq(goal_id))
            .filter(goal_task::Column::TaskId.eq(task_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "task id {task_id} is not linked to goal id {goal_id}"
            )));
        }
        Ok(())
    }

    pub async fn add_tasks(
        &self,
        titles: Vec<String>,
        size: i32,
        parent_id: Option<i64>,
        goal_id: Option<i64>,
    ) -> Result<Vec<task::Model>, AppError> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }
        for title in &titles {
            ensure_non_empty("task title", title)?;
        }
        ensure_positive_size(size)?;

        let txn = self.db.begin().await?;
        let result: Result<Vec<task::Model>, AppError> = async {
            if let Some(parent_id) = parent_id {
                task::Entity::find_by_id(parent_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("task id {parent_id}")))?;
            }
            if let Some(goal_id) = goal_id {
                goal::Entity::find_by_id(goal_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("goal id {goal_id}")))?;
            }

            let now = Utc::now();
            let mut created = Vec::with_capacity(titles.len());
            for title in titles.into_iter() {
                let active = task::ActiveModel {
                    title: Set(title),
                    size: Set(size),
                    completed: Set(false),
                    parent_id: Set(parent_id),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                let insert = task::Entity::insert(active).exec(&txn).await?;
                let model = task::Entity::find_by_id(insert.last_insert_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound("task not found after insert".to_string())
                    })?;
                if let Some(goal_id) = goal_id {
                    let link = goal_task::ActiveModel {
                        goal_id: Set(goal_id),
                        task_id: Set(model.id),
                        created_at: Set(now),
                        ..Default::default()
                    };
                    goal_task::Entity::insert(link).exec(&txn).await?;
                }
                created.push(model);
            }

            Ok(created)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<task::Model>, AppError> {
        let mut select = task::Entity::find();
        if let Some(goal_id) = query.goal_id {
            select = select.filter(task::Column::Id.is_in(self.linked_task_ids(goal_id).await?));
        }
        if let Some(completed) = query.completed {
            select = select.filter(task::Column::Completed.eq(completed));
        }
        let order = query.order.unwrap_or(TaskOrder::Id);
        match (order, query.desc) {
            (TaskOrder::Id, true) => select = select.order_by_desc(task::Column::Id),
            (TaskOrder::Id, false) => select = select.order_by_asc(task::Column::Id),
            (TaskOrder::Title, true) => select = select.order_by_desc(task::Column::Title),
            (TaskOrder::Title, false) => select = select.order_by_asc(task::Column::Title),
            (TaskOrder::Created, true) => select = select.order_by_desc(task::Column::CreatedAt),
            (TaskOrder::Created, false) => select = select.order_by_asc(task::Column::CreatedAt),
        }
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }
        if let Some(offset) = query.offset {
            select = select.offset(offset);
        }
        Ok(select.order_by_asc(task::Column::Id).all(&self.db).await?)
    }

    pub async fn count_tasks(&self, query: &TaskQuery) -> Result<u64, AppError> {
        let mut select = task::Entity::find();
        if let Some(goal_id) = query.goal_id {
            select = select.filter(task::Column::Id.is_in(self.linked_task_ids(goal_id).await?));
        }
        if let Some(completed) = query.completed {
            select = select.filter(task::Column::Completed.eq(completed));
        }
        Ok(select.count(&self.db).await?)
    }

    async fn linked_task_ids(&self, goal_id: i64) -> Result<Vec<i64>, AppError> {
        self.get_goal(goal_id).await?;
        let links = goal_task::Entity::find()
            .filter(goal_task::Column::GoalId.eq(goal_id))
            .all(&self.db)
            .await?;
        Ok(links.iter().map(|link| link.task_id).collect())
    }

    pub async fn update_task(
        &self,
        id: i64,
        changes: TaskChanges,
    ) -> Result<task::Model, AppError> {
        if let Some(title) = changes.title.as_deref() {
            ensure_non_empty("task title", title)?;
        }
        if let Some(size) = changes.size {
            ensure_positive_size(size)?;
        }

        let txn = self.db.begin().await?;
        let result: Result<task::Model, AppError> = async {
            if let Some(ParentUpdate::Assign(parent_id)) = changes.parent {
                self.ensure_task_parent_valid_with_conn(&txn, id, parent_id)
                    .await?;
            }

            let mut active = task::ActiveModel {
                id: Set(id),
                ..Default::default()
            };
            if let Some(title) = changes.title {
                active.title = Set(title);
            }
            if let Some(size) = changes.size {
                active.size = Set(size);
            }
            match changes.parent {
                Some(ParentUpdate::Assign(parent_id)) => active.parent_id = Set(Some(parent_id)),
                Some(ParentUpdate::Detach) => active.parent_id = Set(None),
                None => {}
            }
            active.updated_at = Set(Utc::now());

            match active.update(&txn).await {
                Ok(model) => Ok(model),
                Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                    Err(AppError::NotFound(format!("task id {id}")))
                }
                Err(err) => Err(err.into()),
            }
        }
        .await;

        finalize_transaction(txn, result).await
    }

    async fn ensure_task_parent_valid_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
        parent_id: i64,
    ) -> Result<(), AppError> {
        if parent_id == id {
            return Err(AppError::InvalidInput(
                "task cannot be its own parent".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        let mut cursor = Some(parent_id);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                break;
            }
            let task = task::Entity::find_by_id(current)
                .one(db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("task id {current}")))?;
            if task.id == id {
                return Err(AppError::InvalidInput(format!(
                    "task id {parent_id} is a descendant of task id {id}"
                )));
            }
            cursor = task.parent_id;
        }
        Ok(())
    }

    pub async fn delete_tasks(&self, ids: &[i64]) -> Result<u64, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<u64, AppError> = async {
            if ids.is_empty() {
                return Ok(0);
            }
            let unique_ids = unique_ids(ids);
            let tasks = task::Entity::find()
                .filter(task::Column::Id.is_in(unique_ids.clone()))
                .all(&txn)
                .await?;
            let existing: HashSet<i64> = tasks.iter().map(|task| task.id).collect();
            let missing: Vec<i64> = unique_ids
                .iter()
                .cloned()
                .filter(|id| !existing.contains(id))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "task id(s) not found: {}",
                    join_ids(&missing)
                )));
            }

            goal_task::Entity::delete_many()
                .filter(goal_task::Column::TaskId.is_in(unique_ids.clone()))
                .exec(&txn)
                .await?;

            let subtasks = task::Entity::find()
                .filter(task::Column::ParentId.is_in(unique_ids.clone()))
                .all(&txn)
                .await?;
            let now = Utc::now();
            for subtask in subtasks {
                if existing.contains(&subtask.id) {
                    continue;
                }
                let mut active: task::ActiveModel = subtask.into();
                active.parent_id = Set(None);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }

            let result = task::Entity::delete_many()
                .filter(task::Column::Id.is_in(unique_ids))
                .exec(&txn)
                .await?;

            Ok(result.rows_affected)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn set_tasks_done(
        &self,
        ids: &[i64],
    ) -> Result<(Vec<task::Model>, CascadeReport), AppError> {
        self.toggle_tasks(ids, true).await
    }

    pub async fn set_tasks_undone(
        &self,
        ids: &[i64],
    ) -> Result<(Vec<task::Model>, CascadeReport), AppError> {
        self.toggle_tasks(ids, false).await
    }

    async fn toggle_tasks(
        &self,
        ids: &[i64],
        completed: bool,
    ) -> Result<(Vec<task::Model>, CascadeReport), AppError> {
        if ids.is_empty() {
            return Ok((Vec::new(), CascadeReport::default()));
        }
        let unique = unique_ids(ids);
        let txn = self.db.begin().await?;
        let result: Result<(Vec<task::Model>, CascadeReport), AppError> = async {
            let tasks = task::Entity::find()
                .filter(task::Column::Id.is_in(unique.clone()))
                .order_by_asc(task::Column::Id)
                .all(&txn)
                .await?;
            let existing: HashSet<i64> = tasks.iter().map(|task| task.id).collect();
            let missing: Vec<i64> = unique
                .iter()
                .cloned()
                .filter(|id| !existing.contains(id))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "task id(s) not found: {}",
                    join_ids(&missing)
                )));
            }

            let mut updated = Vec::with_capacity(tasks.len());
            let mut report = CascadeReport::default();
            for task_model in tasks {
                let (task_model, changes) = self
                    .toggle_task_with_conn(&txn, task_model, completed)
                    .await?;
                report.merge(changes);
                updated.push(task_model);
            }

            Ok((updated, report))
        }
        .await;

        finalize_transaction(txn, result).await
    }

    async fn toggle_task_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        task: task::Model,
        completed: bool,
    ) -> Result<(task::Model, CascadeReport), AppError> {
        if task.completed == completed {
            return Ok((task, CascadeReport::default()));
        }

        let mut active: task::ActiveModel = task.clone().into();
        active.completed = Set(completed);
        active.updated_at = Set(Utc::now());
        let task = active.update(db).await?;

        let links = goal_task::Entity::find()
            .filter(goal_task::Column::TaskId.eq(task.id))
            .order_by_asc(goal_task::Column::Id)
            .all(db)
            .await?;

        let mut report = CascadeReport::default();
        let delta = if completed {
            f64::from(task.size)
        } else {
            -f64::from(task.size)
        };
        let reason = if completed {
            format!("task '{}' completed", task.title)
        } else {
            format!("task '{}' marked incomplete", task.title)
        };

        for link in links {
            let goal = goal::Entity::find_by_id(link.goal_id)
                .one(db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("goal id {}", link.goal_id)))?;
            let (goal, change) = self
                .adjust_goal_value_with_conn(db, &goal, delta, &reason)
                .await?;
            report.goals.push(change);

            let Some(parent_id) = goal.parent_id else {
                continue;
            };
            let linked = self.tasks_for_goal_with_conn(db, goal.id).await?;
            let mut totals = TaskTotals::default();
            totals.accumulate(&linked);
            let crossed = if completed {
                totals.total_size > 0 && totals.completed_size == totals.total_size
            } else {
                totals.completed_size + progress::effective_size(&task) == totals.total_size
            };
            if !crossed {
                continue;
            }
            let bump = if completed { 1.0 } else { -1.0 };
            let parent_reason = if completed {
                format!("goal '{}' reached 100%", goal.title)
            } else {
                format!("goal '{}' dropped below 100%", goal.title)
            };
            if let Some(change) = self
                .bump_parent_with_conn(db, parent_id, bump, &parent_reason)
                .await?
            {
                report.parents.push(change);
            }
        }

        Ok((task, report))
    }

    async fn bump_parent_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        parent_id: i64,
        delta: f64,
        reason: &str,
    ) -> Result<Option<ValueChange>, AppError> {
        let parent = goal::Entity::find_by_id(parent_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal id {parent_id}")))?;
        match goal_mode(&parent)? {
            ProgressMode::TaskBased | ProgressMode::Habit => {
                let (_, change) = self
                    .adjust_goal_value_with_conn(db, &parent, delta, reason)
                    .await?;
                Ok(Some(change))
            }
            ProgressMode::ManualTotal => Ok(None),
        }
    }

    async fn adjust_goal_value_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        goal: &goal::Model,
        delta: f64,
        reason: &str,
    ) -> Result<(goal::Model, ValueChange), AppError> {
        let next = (goal.current_value + delta).max(0.0);
        let now = Utc::now();
        let mut active: goal::ActiveModel = goal.clone().into();
        active.current_value = Set(next);
        active.updated_at = Set(now);
        let updated = active.update(db).await?;

        let entry = progress_entry::ActiveModel {
            goal_id: Set(updated.id),
            delta: Set(delta),
            note: Set(reason.to_string()),
            created_at: Set(now),
            ..Default::default()
        };
        progress_entry::Entity::insert(entry).exec(db).await?;

        let change = ValueChange {
            goal_id: updated.id,
            delta,
            value: updated.current_value,
            reason: reason.to_string(),
        };
        Ok((updated, change))
    }
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

fn goal_mode(goal: &goal::Model) -> Result<ProgressMode, AppError> {
    ProgressMode::parse(&goal.progress_mode).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "goal id {} has unknown progress mode '{}'",
            goal.id, goal.progress_mode
        ))
    })
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for id in ids {
        if seen.insert(*id) {
            unique.push(*id);
        }
    }
    unique
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn ensure_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(())
}

fn ensure_positive_target(target: f64) -> Result<(), AppError> {
    if !target.is_finite() || target <= 0.0 {
        return Err(AppError::InvalidInput(
            "target value must be a positive number".to_string(),
        ));
    }
    Ok(())
}

fn ensure_positive_size(size: i32) -> Result<(), AppError> {
    if size <= 0 {
        return Err(AppError::InvalidInput(
            "task size must be a positive number".to_string(),
        ));
    }
    Ok(())
}
