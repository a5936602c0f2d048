use actix_web::{get, post, web, HttpResponse};

use crate::context::AppContext;
use crate::errors::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::NewLesson;
use crate::services::catalog_service::CatalogService;
use crate::services::progress_service::ProgressService;

#[post("/{module_id}/lessons")]
pub async fn add_lesson(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<NewLesson>,
) -> Result<HttpResponse, AppError> {
    let lesson = CatalogService::add_lesson(&ctx, &auth_user.user, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(lesson))
}

#[get("/{module_id}/progress")]
pub async fn module_progress(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let summary = ProgressService::module_progress(&ctx, auth_user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// POST /lessons/{id}/access - Ouverture d'une leçon
#[post("/{lesson_id}/access")]
pub async fn record_access(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let row = ProgressService::record_lesson_access(&ctx, auth_user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(row))
}

#[post("/{lesson_id}/complete")]
pub async fn complete_lesson(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let row = ProgressService::complete_lesson(&ctx, auth_user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(row))
}

pub fn lessons_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/modules")
            .service(add_lesson)
            .service(module_progress),
    )
    .service(
        web::scope("/lessons")
            .service(record_access)
            .service(complete_lesson),
    );
}
