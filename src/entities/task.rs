use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::goal_task;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub size: i32,
    pub completed: bool,
    pub parent_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Parent,
    GoalTask,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Parent => Entity::belongs_to(Entity)
                .from(Column::ParentId)
                .to(Column::Id)
                .into(),
            Self::GoalTask => Entity::has_many(goal_task::Entity).into(),
        }
    }
}

impl Related<goal_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GoalTask.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
