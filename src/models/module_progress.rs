use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Progression (user × module), créée au premier accès à une leçon du module.
/// `completed` n'est posé que par le rollup explicite
/// (ProgressService::sync_completion), jamais en cascade.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "module_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub module_id: i32,

    pub completed: bool,
    pub last_accessed: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
