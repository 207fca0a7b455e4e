use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema, Statement};
use url::Url;

use crate::entities::{goal, goal_task, progress_entry, task};
use crate::error::AppError;

pub fn resolve_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("stride.db")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut goal_stmt = schema.create_table_from_entity(goal::Entity);
    goal_stmt.if_not_exists();
    db.execute(builder.build(&goal_stmt)).await?;

    let mut task_stmt = schema.create_table_from_entity(task::Entity);
    task_stmt.if_not_exists();
    db.execute(builder.build(&task_stmt)).await?;

    let mut link_stmt = schema.create_table_from_entity(goal_task::Entity);
    link_stmt.if_not_exists();
    db.execute(builder.build(&link_stmt)).await?;

    let mut entry_stmt = schema.create_table_from_entity(progress_entry::Entity);
    entry_stmt.if_not_exists();
    db.execute(builder.build(&entry_stmt)).await?;

    let mut goal_parent_index = Index::create()
        .name("idx_goals_parent")
        .table(goal::Entity)
        .col(goal::Column::ParentId)
        .to_owned();
    goal_parent_index.if_not_exists();
    db.execute(builder.build(&goal_parent_index)).await?;

    let mut task_parent_index = Index::create()
        .name("idx_tasks_parent")
        .table(task::Entity)
        .col(task::Column::ParentId)
        .to_owned();
    task_parent_index.if_not_exists();
    db.execute(builder.build(&task_parent_index)).await?;

    let mut link_goal_index = Index::create()
        .name("idx_goal_tasks_goal")
        .table(goal_task::Entity)
        .col(goal_task::Column::GoalId)
        .to_owned();
    link_goal_index.if_not_exists();
    db.execute(builder.build(&link_goal_index)).await?;

    let mut link_pair_index = Index::create()
        .name("idx_goal_tasks_pair")
        .table(goal_task::Entity)
        .col(goal_task::Column::GoalId)
        .col(goal_task::Column::TaskId)
        .unique()
        .to_owned();
    link_pair_index.if_not_exists();
    db.execute(builder.build(&link_pair_index)).await?;

    let mut entry_goal_index = Index::create()
        .name("idx_progress_entries_goal")
        .table(progress_entry::Entity)
        .col(progress_entry::Column::GoalId)
        .to_owned();
    entry_goal_index.if_not_exists();
    db.execute(builder.build(&entry_goal_index)).await?;

    Ok(())
}
