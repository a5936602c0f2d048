pub mod admin;
pub mod auth;
pub mod courses;
pub mod health;
pub mod lessons;
pub mod trainers;

use actix_web::web;

use crate::errors::AppError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Corps JSON / paramètres illisibles: même format d'erreur que le reste
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::invalid(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::invalid(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::invalid(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(courses::courses_routes)
            .configure(lessons::lessons_routes)
            .configure(trainers::trainers_routes)
            .configure(admin::admin_routes),
    );
}
