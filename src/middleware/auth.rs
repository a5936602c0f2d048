use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::context::AppContext;
use crate::errors::{AppError, AuthError};
use crate::models::users;
use crate::services::identity_service::IdentityService;

/// Utilisateur authentifié par un token de session valide.
/// Utilisé comme extracteur dans les routes protégées.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: users::Model,
}

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}

/// Extrait "Bearer <token>" du header Authorization
fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // 1. Contexte applicatif et token, lus de façon synchrone
        let ctx = req.app_data::<web::Data<AppContext>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let ctx = ctx.ok_or_else(|| AppError::Internal("application context missing".to_string()))?;
            let token = token.ok_or(AuthError::Unauthenticated)?;

            // 2. Vérifier le token et charger l'utilisateur
            let user = IdentityService::session_user(&ctx, &token).await?;
            Ok(AuthUser { user })
        })
    }
}
