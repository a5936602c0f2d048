// ============================================================================
// MODÈLE : USERS
// ============================================================================
//
// Colonnes de la table users:
//   - id (INTEGER, PRIMARY KEY)
//   - username (VARCHAR, UNIQUE, NOT NULL)
//   - email (VARCHAR, UNIQUE, NOT NULL) - stocké en minuscules
//   - password_hash (VARCHAR, NOT NULL) - pbkdf2:sha256:iterations$salt$hash
//   - first_name / last_name (VARCHAR, NOT NULL)
//   - role (SMALLINT) - 0 USER, 1 ADMIN, 2 TRAINER, 3 EDITOR
//   - email_confirmed (BOOLEAN) + email_confirmed_at (TIMESTAMP, NULL)
//   - token_version (INTEGER) - incrémenté au logout / reset password
//   - bio, is_csp, is_cst - profil formateur
//   - created_at / updated_at
//
// Points d'attention:
//   - Jamais supprimé (pas de hard delete)
//   - Pas de colonne admin: voir Model::is_admin()
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::role::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    #[serde(skip_serializing)] // Ne jamais exposer le hash en JSON
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub role: Role,

    pub email_confirmed: bool,
    pub email_confirmed_at: Option<DateTime>,

    #[serde(skip_serializing)]
    pub token_version: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    pub is_csp: bool, // Certified Scrum Practitioner
    pub is_cst: bool, // Certified Scrum Trainer

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Correspondance exacte du rôle, sans hiérarchie:
/// un ADMIN n'est pas implicitement TRAINER et inversement.
pub fn authorize(user: &Model, required: Role) -> bool {
    user.role == required
}

/// Vrai si le rôle de l'utilisateur fait partie de la liste (toujours exact)
pub fn authorize_any(user: &Model, allowed: &[Role]) -> bool {
    allowed.contains(&user.role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn user_with(role: Role) -> Model {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        Model {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            first_name: "Alice".into(),
            last_name: "Martin".into(),
            role,
            email_confirmed: false,
            email_confirmed_at: None,
            token_version: 0,
            bio: None,
            is_csp: false,
            is_cst: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case(Role::User, Role::User, true)]
    #[case(Role::Admin, Role::Admin, true)]
    #[case(Role::Trainer, Role::Admin, false)]
    #[case(Role::Admin, Role::Trainer, false)]
    #[case(Role::Editor, Role::User, false)]
    #[case(Role::Admin, Role::User, false)]
    fn test_authorize_is_exact(#[case] role: Role, #[case] required: Role, #[case] expected: bool) {
        assert_eq!(authorize(&user_with(role), required), expected);
    }

    #[test]
    fn test_authorize_any() {
        let allowed = [Role::Admin, Role::Trainer];
        assert!(authorize_any(&user_with(Role::Trainer), &allowed));
        assert!(!authorize_any(&user_with(Role::Editor), &allowed));
    }

    #[rstest]
    #[case(Role::Admin, true)]
    #[case(Role::User, false)]
    #[case(Role::Trainer, false)]
    #[case(Role::Editor, false)]
    fn test_admin_flag_is_derived_from_role(#[case] role: Role, #[case] expected: bool) {
        assert_eq!(user_with(role).is_admin(), expected);
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let json = serde_json::to_value(user_with(Role::User)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("token_version").is_none());
        assert_eq!(json["role"], "USER");
    }
}
