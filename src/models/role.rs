use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rôle unique d'un utilisateur (valeurs SMALLINT de l'ancienne base).
/// Il n'y a pas de colonne `admin` séparée: `is_admin()` est dérivé du rôle,
/// les deux ne peuvent donc pas diverger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    #[sea_orm(num_value = 0)]
    User,
    #[sea_orm(num_value = 1)]
    Admin,
    #[sea_orm(num_value = 2)]
    Trainer,
    #[sea_orm(num_value = 3)]
    Editor,
}

/// Rôles autorisés à créer du contenu de catalogue
pub const AUTHORING_ROLES: &[Role] = &[Role::Admin, Role::Trainer];
