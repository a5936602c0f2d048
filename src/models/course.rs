// ============================================================================
// MODÈLE : COURSES
// ============================================================================
//
// Colonnes de la table courses:
//   - id (INTEGER, PRIMARY KEY)
//   - title (VARCHAR, UNIQUE, NOT NULL)
//   - summary / description (TEXT, NULL)
//   - price (DECIMAL(10,2)) - 0 = cours gratuit
//   - level (VARCHAR, NULL) - Beginner, Advanced, ...
//   - duration (INTEGER, NULL) - en heures
//   - category_id (FK categories, ON DELETE CASCADE)
//   - creator_id (FK users)
//   - created_at / updated_at
//
// Points d'attention:
//   - DELETE d'un cours supprime ses modules, leçons et reviews (FK CASCADE)
//   - Les inscriptions et la progression ne sont PAS supprimées: ces tables
//     n'ont pas de FK vers le catalogue, les lignes restent comme historique
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,

    pub level: Option<String>,
    pub duration: Option<i32>,

    pub category_id: Option<i32>,
    pub creator_id: Option<i32>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatorId",
        to = "super::users::Column::Id"
    )]
    Creator,

    #[sea_orm(has_many = "super::course_module::Entity")]
    Modules,

    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::course_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Modules.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
