use actix_web::{post, put, web, HttpResponse};

use crate::context::AppContext;
use crate::errors::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{EnrollmentResponse, PaymentStatusRequest, SetRoleRequest, UserResponse};
use crate::services::enrollment_service::{CompletionSource, EnrollmentService};
use crate::services::identity_service::IdentityService;

// Toutes ces routes exigent le rôle ADMIN (vérifié dans les services)

#[put("/users/{user_id}/role")]
pub async fn set_role(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SetRoleRequest>,
) -> Result<HttpResponse, AppError> {
    let user = IdentityService::set_role(&ctx, &auth_user.user, path.into_inner(), body.role).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// POST /admin/enrollments/{user_id}/{course_id}/complete - Forçage manuel
#[post("/enrollments/{user_id}/{course_id}/complete")]
pub async fn override_completion(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, course_id) = path.into_inner();
    let source = CompletionSource::AdminOverride {
        actor: &auth_user.user,
    };
    let row = EnrollmentService::mark_completed(&ctx, user_id, course_id, source).await?;
    Ok(HttpResponse::Ok().json(EnrollmentResponse::from(row)))
}

#[put("/enrollments/{user_id}/{course_id}/payment")]
pub async fn record_payment(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
    body: web::Json<PaymentStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let (user_id, course_id) = path.into_inner();
    let row = EnrollmentService::record_payment_status(&ctx, &auth_user.user, user_id, course_id, body.status).await?;
    Ok(HttpResponse::Ok().json(EnrollmentResponse::from(row)))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(set_role)
            .service(override_completion)
            .service(record_payment),
    );
}
