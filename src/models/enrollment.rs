// ============================================================================
// MODÈLE : ENROLLMENTS
// ============================================================================
//
// Colonnes de la table enrollments:
//   - user_id (INTEGER, PK, FK vers users)
//   - course_id (INTEGER, PK) - pas de FK: survit à la suppression du cours
//   - enrolled_at (TIMESTAMP, NOT NULL)
//   - completed (BOOLEAN) + completed_at (TIMESTAMP, NULL)
//   - payment_status (VARCHAR) - free, pending, paid, refunded
//
// Workflow:
//   1. User appelle POST /api/courses/{id}/enroll
//   2. INSERT ... ON CONFLICT (user_id, course_id) DO NOTHING
//   3. 0 ligne insérée = déjà inscrit (pas une erreur)
//
// Points d'attention:
//   - La clé primaire composite garantit au plus une ligne par (user, cours)
//   - completed n'est jamais modifié par l'élève directement: seulement par
//     le rollup de progression ou un override admin
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Statut de paiement enregistré (aucun traitement de paiement ici)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "free")]
    Free,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: i32,

    pub enrolled_at: DateTime,
    pub completed: bool,
    pub completed_at: Option<DateTime>,
    pub payment_status: PaymentStatus,
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
