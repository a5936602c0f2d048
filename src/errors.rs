//! Erreurs applicatives
//!
//! Toutes les opérations des services retournent `Result<_, AppError>`.
//! Les erreurs SeaORM sont interprétées ici (violation d'unicité → Conflict,
//! clé étrangère / enregistrement absent → NotFound) et ne remontent jamais
//! brutes jusqu'au client.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

use crate::utils::password::PasswordError;
use crate::utils::tokens::TokenError;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Rating must be between 0 and 5 (got {0})")]
    InvalidRating(f64),

    #[error("Invalid input: {0}")]
    Fields(validator::ValidationErrors),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("A course with this title already exists")]
    DuplicateTitle,

    #[error("This position is already used")]
    DuplicateOrder,

    #[error("Resource already exists")]
    Duplicate(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    // Même message que l'email soit inconnu ou le mot de passe faux
    #[error("Invalid email or password")]
    InvalidCredentials,

    // Même message que le token soit expiré, falsifié ou d'un autre type
    #[error("Invalid or expired link")]
    InvalidToken,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("You are not enrolled in this course")]
    NotEnrolled,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Internal server error")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation(ValidationError::Invalid(message.into()))
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(ValidationError::InvalidRating(_)) => "INVALID_RATING",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Auth(AuthError::InvalidCredentials) => "INVALID_CREDENTIALS",
            AppError::Auth(AuthError::InvalidToken) => "INVALID_TOKEN",
            AppError::Auth(AuthError::Unauthenticated) => "UNAUTHENTICATED",
            AppError::Auth(AuthError::Forbidden) => "FORBIDDEN",
            AppError::Auth(AuthError::NotEnrolled) => "NOT_ENROLLED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                ConflictError::Duplicate(detail).into()
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => AppError::NotFound("referenced record"),
            _ => match err {
                DbErr::RecordNotFound(_) => AppError::NotFound("record"),
                other => {
                    tracing::error!(error = %other, "storage failure");
                    AppError::Internal(other.to_string())
                }
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(ValidationError::Fields(errors))
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::Auth(AuthError::InvalidToken),
            TokenError::Signing => AppError::Internal(err.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        tracing::error!(error = %err, "password hashing failure");
        AppError::Internal(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a validator::ValidationErrors>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(AuthError::Forbidden | AuthError::NotEnrolled) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            AppError::Validation(ValidationError::Fields(errors)) => Some(errors),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            // Le détail interne reste dans les logs
            error: self.to_string(),
            code: self.code(),
            details,
        })
    }
}
