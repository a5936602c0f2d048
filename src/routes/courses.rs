use actix_web::{delete, get, post, web, HttpResponse};

use crate::context::AppContext;
use crate::errors::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{
    CourseResponse, EnrollmentResponse, NewCategory, NewCourse, NewModule, ReviewRequest, ReviewResponse,
};
use crate::services::catalog_service::CatalogService;
use crate::services::enrollment_service::{EnrollOutcome, EnrollmentService};
use crate::services::progress_service::ProgressService;
use crate::services::rating_service::RatingService;

// ----------------------------------------------------------------------------
// Catalogue
// ----------------------------------------------------------------------------

#[get("")]
pub async fn list_courses(ctx: web::Data<AppContext>) -> Result<HttpResponse, AppError> {
    let courses = CatalogService::list_courses(&ctx).await?;
    let response: Vec<CourseResponse> = courses.iter().map(CourseResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

#[post("")]
pub async fn create_course(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    body: web::Json<NewCourse>,
) -> Result<HttpResponse, AppError> {
    let course = CatalogService::create_course(&ctx, &auth_user.user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(CourseResponse::from(&course)))
}

/// GET /courses/{id} - Cours + modules + leçons
#[get("/{course_id}")]
pub async fn course_outline(
    ctx: web::Data<AppContext>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let outline = CatalogService::course_outline(&ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outline))
}

#[delete("/{course_id}")]
pub async fn delete_course(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    CatalogService::delete_course(&ctx, &auth_user.user, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{course_id}/modules")]
pub async fn add_module(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<NewModule>,
) -> Result<HttpResponse, AppError> {
    let module = CatalogService::add_module(&ctx, &auth_user.user, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(module))
}

// ----------------------------------------------------------------------------
// Inscription et progression
// ----------------------------------------------------------------------------

/// POST /courses/{id}/enroll - 201 à la première inscription, 200 ensuite
#[post("/{course_id}/enroll")]
pub async fn enroll(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let course_id = path.into_inner();
    let outcome = EnrollmentService::enroll(&ctx, auth_user.id(), course_id).await?;
    let enrollment = EnrollmentService::find(&ctx, auth_user.id(), course_id).await?;

    let body = serde_json::json!({
        "status": outcome,
        "enrollment": EnrollmentResponse::from(enrollment),
    });
    Ok(match outcome {
        EnrollOutcome::Enrolled => HttpResponse::Created().json(body),
        EnrollOutcome::AlreadyEnrolled => HttpResponse::Ok().json(body),
    })
}

#[get("/{course_id}/progress")]
pub async fn course_progress(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let report = ProgressService::course_progress(&ctx, auth_user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// POST /courses/{id}/progress/sync - Reporte les ratios à 1.0 sur les drapeaux
#[post("/{course_id}/progress/sync")]
pub async fn sync_progress(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let report = ProgressService::sync_completion(&ctx, auth_user.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/{course_id}/lessons/total")]
pub async fn total_lessons(
    ctx: web::Data<AppContext>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let course_id = path.into_inner();
    let total = ProgressService::total_lessons(&ctx, course_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "course_id": course_id,
        "total_lessons": total
    })))
}

// ----------------------------------------------------------------------------
// Avis
// ----------------------------------------------------------------------------

#[get("/{course_id}/reviews")]
pub async fn list_reviews(
    ctx: web::Data<AppContext>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let reviews = RatingService::course_reviews(&ctx, path.into_inner()).await?;
    let response: Vec<ReviewResponse> = reviews.iter().map(ReviewResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

#[post("/{course_id}/reviews")]
pub async fn submit_review(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let review = RatingService::submit_review(&ctx, auth_user.id(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ReviewResponse::from(&review)))
}

#[get("/{course_id}/rating")]
pub async fn course_rating(
    ctx: web::Data<AppContext>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let summary = RatingService::course_rating_summary(&ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

// ----------------------------------------------------------------------------
// Catégories et inscriptions de l'utilisateur
// ----------------------------------------------------------------------------

#[get("")]
pub async fn list_categories(ctx: web::Data<AppContext>) -> Result<HttpResponse, AppError> {
    let categories = CatalogService::list_categories(&ctx).await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[post("")]
pub async fn create_category(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    body: web::Json<NewCategory>,
) -> Result<HttpResponse, AppError> {
    let category = CatalogService::create_category(&ctx, &auth_user.user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

/// GET /enrollments - Mes inscriptions
#[get("")]
pub async fn my_enrollments(ctx: web::Data<AppContext>, auth_user: AuthUser) -> Result<HttpResponse, AppError> {
    let rows = EnrollmentService::list_for_user(&ctx, auth_user.id()).await?;
    let response: Vec<EnrollmentResponse> = rows.into_iter().map(EnrollmentResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

pub fn courses_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/courses")
            .service(list_courses)
            .service(create_course)
            .service(course_outline)
            .service(delete_course)
            .service(add_module)
            .service(enroll)
            .service(course_progress)
            .service(sync_progress)
            .service(total_lessons)
            .service(list_reviews)
            .service(submit_review)
            .service(course_rating),
    )
    .service(
        web::scope("/categories")
            .service(list_categories)
            .service(create_category),
    )
    .service(web::scope("/enrollments").service(my_enrollments));
}
