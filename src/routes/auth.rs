use actix_web::{get, post, web, HttpResponse};

use crate::context::AppContext;
use crate::errors::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, TokenQuery, UserResponse,
};
use crate::services::identity_service::IdentityService;

/// POST /auth/register - Créer un compte (PUBLIC)
#[post("/register")]
pub async fn register(
    ctx: web::Data<AppContext>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let user = IdentityService::register(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// POST /auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    ctx: web::Data<AppContext>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let (user, token) = IdentityService::login(&ctx, &body).await?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/// POST /auth/logout - Fermer toutes les sessions (PROTÉGÉE)
#[post("/logout")]
pub async fn logout(ctx: web::Data<AppContext>, auth_user: AuthUser) -> Result<HttpResponse, AppError> {
    IdentityService::logout(&ctx, auth_user.id()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// GET /auth/me - Utilisateur courant (PROTÉGÉE)
#[get("/me")]
pub async fn me(auth_user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(&auth_user.user))
}

/// POST /auth/change-password - Changer son mot de passe (PROTÉGÉE)
#[post("/change-password")]
pub async fn change_password(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let token = IdentityService::change_password(&ctx, &auth_user.user, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password changed successfully",
        "token": token
    })))
}

/// POST /auth/forgot-password - Toujours la même réponse (PUBLIC)
#[post("/forgot-password")]
pub async fn forgot_password(
    ctx: web::Data<AppContext>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    IdentityService::request_password_reset(&ctx, &body.email).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "If this email is registered, a reset link has been sent"
    })))
}

/// POST /auth/reset-password (PUBLIC)
#[post("/reset-password")]
pub async fn reset_password(
    ctx: web::Data<AppContext>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    IdentityService::reset_password(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password has been reset"
    })))
}

/// GET /auth/confirm-email?token=... - Lien reçu par email (PUBLIC)
#[get("/confirm-email")]
pub async fn confirm_email(
    ctx: web::Data<AppContext>,
    query: web::Query<TokenQuery>,
) -> Result<HttpResponse, AppError> {
    let user = IdentityService::confirm_email_with_token(&ctx, &query.token).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// POST /auth/resend-confirmation (PROTÉGÉE)
#[post("/resend-confirmation")]
pub async fn resend_confirmation(ctx: web::Data<AppContext>, auth_user: AuthUser) -> HttpResponse {
    IdentityService::resend_confirmation(&ctx, &auth_user.user);
    HttpResponse::Accepted().json(serde_json::json!({ "success": true }))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(logout)
            .service(me)
            .service(change_password)
            .service(forgot_password)
            .service(reset_password)
            .service(confirm_email)
            .service(resend_confirmation),
    );
}
