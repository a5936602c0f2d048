use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Note d'un formateur par un utilisateur, une ligne par (rater, trainer)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trainer_ratings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub rater_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub trainer_id: i32,

    pub rating: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub review: Option<String>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::RaterId",
        to = "super::users::Column::Id"
    )]
    Rater,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::TrainerId",
        to = "super::users::Column::Id"
    )]
    Trainer,
}

impl ActiveModelBehavior for ActiveModel {}
