// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table avec SeaORM (PostgreSQL en prod,
//   SQLite en test).
//
// Liste des modules:
//   - health : Health check API
//   - role : Rôles utilisateur (USER, ADMIN, TRAINER, EDITOR)
//   - metadata : Horodatage commun created_at / updated_at
//   - users : Utilisateurs
//   - category / course / course_module / course_lesson : Catalogue
//   - enrollment : Inscriptions (user × cours)
//   - module_progress / lesson_progress : Progression
//   - review : Avis sur les cours
//   - trainer_rating : Notes des formateurs
//   - dto : Data Transfer Objects pour l'API
//
// Points d'attention:
//   - Les relations sont déclarées uniquement là où une FK existe
//   - enrollment et *_progress n'ont de FK que vers users
//
// ============================================================================

pub mod health;
pub mod role;
pub mod metadata;
pub mod users;
pub mod category;
pub mod course;
pub mod course_module;
pub mod course_lesson;
pub mod enrollment;
pub mod module_progress;
pub mod lesson_progress;
pub mod review;
pub mod trainer_rating;
pub mod dto;
