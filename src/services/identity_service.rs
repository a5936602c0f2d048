use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{info, warn};
use validator::Validate;

use crate::context::AppContext;
use crate::errors::{AppError, AppResult, AuthError, ConflictError};
use crate::models::dto::{ChangePasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest};
use crate::models::metadata::CreationMetadata;
use crate::models::role::Role;
use crate::models::users::{self, authorize};
use crate::services::mail_service::{confirmation_email, dispatch, password_reset_email};
use crate::utils::password;
use crate::utils::tokens::TokenPurpose;

pub struct IdentityService;

impl IdentityService {
    /// Crée un compte USER non confirmé et envoie le lien de confirmation.
    /// L'envoi de l'email ne peut pas faire échouer l'inscription.
    pub async fn register(ctx: &AppContext, request: RegisterRequest) -> AppResult<users::Model> {
        let request = request.trimmed();
        request.validate()?;

        let username = request.username;
        let email = request.email;

        // 1. Vérifier l'unicité (message précis pour le client)
        let username_taken = users::Entity::find()
            .filter(users::Column::Username.eq(&username))
            .one(&ctx.db)
            .await?
            .is_some();
        if username_taken {
            return Err(ConflictError::DuplicateUsername.into());
        }

        let email_taken = users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(&ctx.db)
            .await?
            .is_some();
        if email_taken {
            return Err(ConflictError::DuplicateEmail.into());
        }

        // 2. Hash le mot de passe
        let password_hash = hash_blocking(request.password, ctx.settings.password_iterations).await?;

        // 3. Créer l'utilisateur (l'index unique tranche en cas de course)
        let meta = CreationMetadata::new(ctx.now());
        let new_user = users::ActiveModel {
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            role: Set(Role::User),
            email_confirmed: Set(false),
            email_confirmed_at: Set(None),
            token_version: Set(0),
            bio: Set(None),
            is_csp: Set(false),
            is_cst: Set(false),
            created_at: Set(meta.created_at),
            updated_at: Set(meta.updated_at),
            ..Default::default()
        };

        let user = new_user.insert(&ctx.db).await.map_err(user_conflict)?;
        info!(user_id = user.id, "user registered");

        // 4. Email de confirmation (arrière-plan)
        Self::send_confirmation(ctx, &user);

        Ok(user)
    }

    /// Vérifie email + mot de passe. Email inconnu et mauvais mot de passe
    /// donnent exactement la même erreur.
    pub async fn authenticate(ctx: &AppContext, email: &str, password: &str) -> AppResult<users::Model> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(&ctx.db)
            .await?;

        let Some(user) = user else {
            // Même coût qu'une vraie vérification
            let _ = hash_blocking(password.to_string(), ctx.settings.password_iterations).await;
            return Err(AuthError::InvalidCredentials.into());
        };

        match verify_blocking(password.to_string(), user.password_hash.clone()).await? {
            Ok(true) => Ok(user),
            Ok(false) => Err(AuthError::InvalidCredentials.into()),
            Err(e) => {
                warn!(user_id = user.id, error = %e, "stored password hash is unreadable");
                Err(AuthError::InvalidCredentials.into())
            }
        }
    }

    /// Authentifie puis émet un token de session lié à token_version
    pub async fn login(ctx: &AppContext, request: &LoginRequest) -> AppResult<(users::Model, String)> {
        let user = Self::authenticate(ctx, &request.email, &request.password).await?;

        let token = ctx.tokens.issue_versioned(
            TokenPurpose::Session,
            user.id,
            user.token_version,
            ctx.settings.session_token_ttl,
        )?;

        info!(user_id = user.id, "user logged in");
        Ok((user, token))
    }

    /// Retrouve l'utilisateur d'un token de session encore valide
    pub async fn session_user(ctx: &AppContext, token: &str) -> AppResult<users::Model> {
        let verified = ctx
            .tokens
            .verify_versioned(TokenPurpose::Session, token)
            .map_err(|_| AuthError::Unauthenticated)?;

        let user = users::Entity::find_by_id(verified.subject_id)
            .one(&ctx.db)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        // Session émise avant un logout ou un reset password
        if user.token_version != verified.version {
            return Err(AuthError::Unauthenticated.into());
        }

        Ok(user)
    }

    /// Révoque toutes les sessions de l'utilisateur
    pub async fn logout(ctx: &AppContext, user_id: i32) -> AppResult<()> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::TokenVersion, Expr::col(users::Column::TokenVersion).add(1))
            .col_expr(users::Column::UpdatedAt, Expr::value(ctx.now()))
            .filter(users::Column::Id.eq(user_id))
            .exec(&ctx.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("user"));
        }

        info!(user_id, "user logged out");
        Ok(())
    }

    /// Idempotent: seule la transition false → true pose email_confirmed_at
    pub async fn confirm_email(ctx: &AppContext, user_id: i32) -> AppResult<users::Model> {
        let now = ctx.now();

        let result = users::Entity::update_many()
            .col_expr(users::Column::EmailConfirmed, Expr::value(true))
            .col_expr(users::Column::EmailConfirmedAt, Expr::value(Some(now)))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::EmailConfirmed.eq(false))
            .exec(&ctx.db)
            .await?;

        if result.rows_affected > 0 {
            info!(user_id, "email confirmed");
        }

        users::Entity::find_by_id(user_id)
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("user"))
    }

    pub async fn confirm_email_with_token(ctx: &AppContext, token: &str) -> AppResult<users::Model> {
        let user_id = ctx.tokens.verify(TokenPurpose::ConfirmEmail, token)?;

        match Self::confirm_email(ctx, user_id).await {
            Err(AppError::NotFound(_)) => Err(AuthError::InvalidToken.into()),
            other => other,
        }
    }

    pub fn resend_confirmation(ctx: &AppContext, user: &users::Model) {
        if !user.email_confirmed {
            Self::send_confirmation(ctx, user);
        }
    }

    /// Répond toujours Ok pour ne pas révéler quels emails existent
    pub async fn request_password_reset(ctx: &AppContext, email: &str) -> AppResult<()> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(&ctx.db)
            .await?;

        let Some(user) = user else {
            info!("password reset requested for an unknown email");
            return Ok(());
        };

        match ctx.tokens.issue_versioned(
            TokenPurpose::ResetPassword,
            user.id,
            user.token_version,
            ctx.settings.reset_token_ttl,
        ) {
            Ok(token) => {
                let email = password_reset_email(&user, &ctx.settings.public_base_url, &token);
                dispatch(ctx.mailer.clone(), email);
                info!(user_id = user.id, "password reset requested");
            }
            Err(e) => warn!(user_id = user.id, error = %e, "could not issue reset token"),
        }

        Ok(())
    }

    /// Le token porte la token_version courante: l'incrémenter ici le rend
    /// inutilisable une seconde fois et ferme les sessions ouvertes.
    pub async fn reset_password(ctx: &AppContext, request: ResetPasswordRequest) -> AppResult<()> {
        request.validate()?;

        let verified = ctx
            .tokens
            .verify_versioned(TokenPurpose::ResetPassword, &request.token)?;

        let password_hash = hash_blocking(request.new_password, ctx.settings.password_iterations).await?;

        let result = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(users::Column::TokenVersion, Expr::col(users::Column::TokenVersion).add(1))
            .col_expr(users::Column::UpdatedAt, Expr::value(ctx.now()))
            .filter(users::Column::Id.eq(verified.subject_id))
            .filter(users::Column::TokenVersion.eq(verified.version))
            .exec(&ctx.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AuthError::InvalidToken.into());
        }

        info!(user_id = verified.subject_id, "password reset");
        Ok(())
    }

    /// Ferme aussi les autres sessions; le token renvoyé remplace celui
    /// de l'appelant
    pub async fn change_password(
        ctx: &AppContext,
        user: &users::Model,
        request: ChangePasswordRequest,
    ) -> AppResult<String> {
        request.validate()?;

        let is_valid = verify_blocking(request.current_password, user.password_hash.clone())
            .await?
            .unwrap_or(false);
        if !is_valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        let new_password_hash = hash_blocking(request.new_password, ctx.settings.password_iterations).await?;

        let result = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(new_password_hash))
            .col_expr(users::Column::TokenVersion, Expr::col(users::Column::TokenVersion).add(1))
            .col_expr(users::Column::UpdatedAt, Expr::value(ctx.now()))
            .filter(users::Column::Id.eq(user.id))
            .filter(users::Column::TokenVersion.eq(user.token_version))
            .exec(&ctx.db)
            .await?;

        // Session révoquée entre l'authentification et la mise à jour
        if result.rows_affected == 0 {
            return Err(AuthError::Unauthenticated.into());
        }

        let token = ctx.tokens.issue_versioned(
            TokenPurpose::Session,
            user.id,
            user.token_version + 1,
            ctx.settings.session_token_ttl,
        )?;

        info!(user_id = user.id, "password changed");
        Ok(token)
    }

    /// ADMIN uniquement
    pub async fn set_role(
        ctx: &AppContext,
        actor: &users::Model,
        user_id: i32,
        role: Role,
    ) -> AppResult<users::Model> {
        if !authorize(actor, Role::Admin) {
            return Err(AuthError::Forbidden.into());
        }

        let user = users::Entity::find_by_id(user_id)
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        let mut active_model: users::ActiveModel = user.into();
        active_model.role = Set(role);
        active_model.updated_at = Set(ctx.now());
        let updated = active_model.update(&ctx.db).await?;

        info!(actor_id = actor.id, user_id, role = ?role, "role changed");
        Ok(updated)
    }

    fn send_confirmation(ctx: &AppContext, user: &users::Model) {
        match ctx
            .tokens
            .issue(TokenPurpose::ConfirmEmail, user.id, ctx.settings.confirm_token_ttl)
        {
            Ok(token) => {
                let email = confirmation_email(user, &ctx.settings.public_base_url, &token);
                dispatch(ctx.mailer.clone(), email);
            }
            Err(e) => warn!(user_id = user.id, error = %e, "could not issue confirmation token"),
        }
    }
}

// PBKDF2 bloque le thread: hors des workers async
async fn hash_blocking(plain: String, iterations: u32) -> AppResult<String> {
    let hashed = tokio::task::spawn_blocking(move || password::hash_password(&plain, iterations))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))??;
    Ok(hashed)
}

async fn verify_blocking(plain: String, stored: String) -> AppResult<Result<bool, password::PasswordError>> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Violation d'unicité à l'insertion: inscription concurrente du même compte
fn user_conflict(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("email") => {
            ConflictError::DuplicateEmail.into()
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => ConflictError::DuplicateUsername.into(),
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use crate::services::mail_service::{token_from, FailingMailer};
    use crate::test_support::{self, PASSWORD};
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_hashes_password_and_sends_confirmation() {
        let mut app = test_support::test_app().await;

        let user = IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();

        assert_eq!(user.role, Role::User);
        assert!(!user.email_confirmed);
        assert_ne!(user.password_hash, PASSWORD);
        assert!(user.password_hash.starts_with("pbkdf2:sha256:"));

        let email = app.outbox.recv().await.unwrap();
        assert_eq!(email.subject, "[ScrumJET] Confirm Your Email");
        assert_eq!(email.recipients, vec!["alice@example.com".to_string()]);
        assert!(!email.text_body.contains(PASSWORD));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();

        let same_username = IdentityService::register(&app.ctx, test_support::register_request("alice")).await;
        assert!(matches!(
            same_username,
            Err(AppError::Conflict(ConflictError::DuplicateUsername))
        ));

        let mut same_email = test_support::register_request("alice2");
        same_email.email = "ALICE@example.com".to_string();
        let result = IdentityService::register(&app.ctx, same_email).await;
        assert!(matches!(result, Err(AppError::Conflict(ConflictError::DuplicateEmail))));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let app = test_support::test_app().await;

        let mut request = test_support::register_request("bob");
        request.email = "not-an-email".to_string();
        let result = IdentityService::register(&app.ctx, request).await;
        assert!(matches!(result, Err(AppError::Validation(ValidationError::Fields(_)))));

        let mut request = test_support::register_request("bob");
        request.password = "short".to_string();
        assert!(IdentityService::register(&app.ctx, request).await.is_err());
    }

    #[tokio::test]
    async fn test_register_succeeds_when_mail_fails() {
        let (ctx, _clock) = test_support::context_with_mailer(Arc::new(FailingMailer)).await;

        let user = IdentityService::register(&ctx, test_support::register_request("carol")).await;
        assert!(user.is_ok());
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn test_authenticate_does_not_leak_which_part_failed() {
        let app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();

        let ok = IdentityService::authenticate(&app.ctx, "Alice@Example.com", PASSWORD).await;
        assert!(ok.is_ok());

        let wrong_password = IdentityService::authenticate(&app.ctx, "alice@example.com", "nope-nope")
            .await
            .unwrap_err();
        let unknown_email = IdentityService::authenticate(&app.ctx, "ghost@example.com", PASSWORD)
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AppError::Auth(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, AppError::Auth(AuthError::InvalidCredentials)));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_confirm_email_is_idempotent() {
        let mut app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();
        let token = token_from(&app.outbox.recv().await.unwrap());

        let first = IdentityService::confirm_email_with_token(&app.ctx, &token).await.unwrap();
        assert!(first.email_confirmed);
        let confirmed_at = first.email_confirmed_at.unwrap();

        app.clock.advance(Duration::hours(2));
        let second = IdentityService::confirm_email_with_token(&app.ctx, &token).await.unwrap();
        assert!(second.email_confirmed);
        assert_eq!(second.email_confirmed_at, Some(confirmed_at));
    }

    #[tokio::test]
    async fn test_confirm_token_expires_after_a_day() {
        let mut app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();
        let token = token_from(&app.outbox.recv().await.unwrap());

        app.clock.advance(Duration::seconds(86_401));
        let result = IdentityService::confirm_email_with_token(&app.ctx, &token).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::InvalidToken))));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let mut app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();
        app.outbox.recv().await.unwrap(); // confirmation

        IdentityService::request_password_reset(&app.ctx, "alice@example.com")
            .await
            .unwrap();
        let email = app.outbox.recv().await.unwrap();
        assert_eq!(email.subject, "[ScrumJET] Reset Your Password");
        let token = token_from(&email);

        let request = ResetPasswordRequest {
            token: token.clone(),
            new_password: "a-brand-new-password".to_string(),
        };
        IdentityService::reset_password(&app.ctx, request.clone()).await.unwrap();

        assert!(IdentityService::authenticate(&app.ctx, "alice@example.com", "a-brand-new-password")
            .await
            .is_ok());
        assert!(IdentityService::authenticate(&app.ctx, "alice@example.com", PASSWORD)
            .await
            .is_err());

        // Usage unique
        let replay = IdentityService::reset_password(&app.ctx, request).await;
        assert!(matches!(replay, Err(AppError::Auth(AuthError::InvalidToken))));
    }

    #[tokio::test]
    async fn test_reset_token_ttl_boundary() {
        let mut app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();
        app.outbox.recv().await.unwrap();

        IdentityService::request_password_reset(&app.ctx, "alice@example.com")
            .await
            .unwrap();
        let token = token_from(&app.outbox.recv().await.unwrap());

        app.clock.advance(Duration::seconds(601));
        let result = IdentityService::reset_password(
            &app.ctx,
            ResetPasswordRequest {
                token,
                new_password: "a-brand-new-password".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::InvalidToken))));
    }

    #[tokio::test]
    async fn test_confirm_token_cannot_reset_password() {
        let mut app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();
        let confirm_token = token_from(&app.outbox.recv().await.unwrap());

        let result = IdentityService::reset_password(
            &app.ctx,
            ResetPasswordRequest {
                token: confirm_token,
                new_password: "a-brand-new-password".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::InvalidToken))));
    }

    #[tokio::test]
    async fn test_reset_request_for_unknown_email_sends_nothing() {
        let mut app = test_support::test_app().await;

        IdentityService::request_password_reset(&app.ctx, "ghost@example.com")
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert!(app.outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_logout_revokes_sessions() {
        let app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();

        let (user, token) = IdentityService::login(
            &app.ctx,
            &LoginRequest {
                email: "alice@example.com".to_string(),
                password: PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(IdentityService::session_user(&app.ctx, &token).await.unwrap().id, user.id);

        IdentityService::logout(&app.ctx, user.id).await.unwrap();
        let result = IdentityService::session_user(&app.ctx, &token).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::Unauthenticated))));
    }

    #[tokio::test]
    async fn test_set_role_requires_admin() {
        let app = test_support::test_app().await;
        let admin = test_support::create_user(&app.ctx, "root", Role::Admin).await;
        let trainer = test_support::create_user(&app.ctx, "coach", Role::Trainer).await;
        let student = test_support::create_user(&app.ctx, "student", Role::User).await;

        let denied = IdentityService::set_role(&app.ctx, &trainer, student.id, Role::Editor).await;
        assert!(matches!(denied, Err(AppError::Auth(AuthError::Forbidden))));

        let updated = IdentityService::set_role(&app.ctx, &admin, student.id, Role::Editor)
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Editor);
        assert!(!updated.is_admin());
    }

    #[tokio::test]
    async fn test_register_rejects_blank_names() {
        let app = test_support::test_app().await;

        let mut request = test_support::register_request("dave");
        request.username = "   ".to_string();
        let result = IdentityService::register(&app.ctx, request).await;
        assert!(matches!(result, Err(AppError::Validation(ValidationError::Fields(_)))));

        let mut request = test_support::register_request("dave");
        request.first_name = " ".to_string();
        let result = IdentityService::register(&app.ctx, request).await;
        assert!(matches!(result, Err(AppError::Validation(ValidationError::Fields(_)))));

        let mut request = test_support::register_request("dave");
        request.username = "  dave ".to_string();
        request.last_name = " Martin ".to_string();
        let user = IdentityService::register(&app.ctx, request).await.unwrap();
        assert_eq!(user.username, "dave");
        assert_eq!(user.last_name, "Martin");
    }

    #[tokio::test]
    async fn test_change_password_revokes_other_sessions() {
        let app = test_support::test_app().await;
        IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();
        let credentials = LoginRequest {
            email: "alice@example.com".to_string(),
            password: PASSWORD.to_string(),
        };
        let (user, old_token) = IdentityService::login(&app.ctx, &credentials).await.unwrap();

        let request = ChangePasswordRequest {
            current_password: PASSWORD.to_string(),
            new_password: "brand-new-secret".to_string(),
        };
        let new_token = IdentityService::change_password(&app.ctx, &user, request).await.unwrap();

        let old_session = IdentityService::session_user(&app.ctx, &old_token).await;
        assert!(matches!(old_session, Err(AppError::Auth(AuthError::Unauthenticated))));
        assert_eq!(IdentityService::session_user(&app.ctx, &new_token).await.unwrap().id, user.id);

        let old_password = IdentityService::authenticate(&app.ctx, "alice@example.com", PASSWORD).await;
        assert!(matches!(old_password, Err(AppError::Auth(AuthError::InvalidCredentials))));
        assert!(IdentityService::authenticate(&app.ctx, "alice@example.com", "brand-new-secret")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_change_password_checks_current_password() {
        let app = test_support::test_app().await;
        let user = IdentityService::register(&app.ctx, test_support::register_request("alice"))
            .await
            .unwrap();

        let request = ChangePasswordRequest {
            current_password: "not-my-password".to_string(),
            new_password: "brand-new-secret".to_string(),
        };
        let result = IdentityService::change_password(&app.ctx, &user, request).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::InvalidCredentials))));
    }
}
