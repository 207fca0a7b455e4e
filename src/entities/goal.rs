use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::{goal_task, progress_entry};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub progress_mode: String,
    pub target_value: Option<f64>,
    pub current_value: f64,
    pub marked_complete: bool,
    pub parent_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Parent,
    GoalTask,
    ProgressEntry,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Parent => Entity::belongs_to(Entity)
                .from(Column::ParentId)
                .to(Column::Id)
                .into(),
            Self::GoalTask => Entity::has_many(goal_task::Entity).into(),
            Self::ProgressEntry => Entity::has_many(progress_entry::Entity).into(),
        }
    }
}

impl Related<goal_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GoalTask.def()
    }
}

impl Related<progress_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgressEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
