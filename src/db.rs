// connexion BD + création du schéma (développement et tests)

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};
use std::time::Duration;

use crate::config::Settings;
use crate::models::{
    category, course, course_lesson, course_module, enrollment, lesson_progress, module_progress,
    review, trainer_rating, users,
};

pub async fn establish_connection(settings: &Settings) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(settings.database_url.clone());
    options
        .max_connections(20)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}

/// Crée les tables à partir des entités si elles n'existent pas.
/// Les migrations de production ne sont pas gérées ici.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Ordre: les tables référencées par une FK d'abord
    create_table(db, users::Entity).await?;
    create_table(db, category::Entity).await?;
    create_table(db, course::Entity).await?;
    create_table(db, course_module::Entity).await?;
    create_table(db, course_lesson::Entity).await?;
    create_table(db, enrollment::Entity).await?;
    create_table(db, module_progress::Entity).await?;
    create_table(db, lesson_progress::Entity).await?;
    create_table(db, review::Entity).await?;
    create_table(db, trainer_rating::Entity).await?;

    // Unicité de l'ordre dans un cours / dans un module
    create_index(
        db,
        Index::create()
            .name("uq_course_modules_order")
            .table(course_module::Entity)
            .col(course_module::Column::CourseId)
            .col(course_module::Column::Order)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("uq_course_lessons_order")
            .table(course_lesson::Entity)
            .col(course_lesson::Column::ModuleId)
            .col(course_lesson::Column::Order)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    // Lectures fréquentes par cours (pas de FK sur ces colonnes)
    create_index(
        db,
        Index::create()
            .name("idx_enrollments_course")
            .table(enrollment::Entity)
            .col(enrollment::Column::CourseId)
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();

    db.execute(backend.build(&statement)).await?;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, statement: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

/// Base SQLite en mémoire avec le schéma complet.
/// Une seule connexion: chaque connexion `sqlite::memory:` a sa propre base.
#[cfg(test)]
pub async fn test_connection() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.expect("sqlite in memory");
    create_schema(&db).await.expect("schema creation");
    db
}
