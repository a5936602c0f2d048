use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;
use serde::Serialize;
use tracing::info;

use crate::context::AppContext;
use crate::errors::{AppError, AppResult, AuthError};
use crate::models::enrollment::{self, PaymentStatus};
use crate::models::role::Role;
use crate::models::users::{self, authorize};
use crate::models::course;
use crate::services::progress_service::ProgressService;

pub struct EnrollmentService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollOutcome {
    Enrolled,
    AlreadyEnrolled,
}

/// Qui a le droit de marquer une inscription terminée
#[derive(Debug, Clone, Copy)]
pub enum CompletionSource<'a> {
    /// Le calcul de progression (ratio du cours à 1.0)
    Rollup,
    /// Forçage manuel, l'acteur doit être ADMIN
    AdminOverride { actor: &'a users::Model },
}

impl EnrollmentService {
    /// INSERT … ON CONFLICT DO NOTHING: un second appel (même concurrent)
    /// ne crée pas de doublon et renvoie AlreadyEnrolled
    pub async fn enroll(ctx: &AppContext, user_id: i32, course_id: i32) -> AppResult<EnrollOutcome> {
        let course = course::Entity::find_by_id(course_id)
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("course"))?;

        let payment_status = if course.price.is_zero() {
            PaymentStatus::Free
        } else {
            PaymentStatus::Pending
        };

        let row = enrollment::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            enrolled_at: Set(ctx.now()),
            completed: Set(false),
            completed_at: Set(None),
            payment_status: Set(payment_status),
        };

        let result = enrollment::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([enrollment::Column::UserId, enrollment::Column::CourseId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&ctx.db)
            .await;

        let inserted = match result {
            Ok(rows) => rows,
            Err(DbErr::RecordNotInserted) => 0,
            Err(e) => return Err(e.into()),
        };

        if inserted == 0 {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        info!(user_id, course_id, payment_status = ?payment_status, "user enrolled");
        Ok(EnrollOutcome::Enrolled)
    }

    /// Lecture par clé primaire composite
    pub async fn is_enrolled<C: ConnectionTrait>(conn: &C, user_id: i32, course_id: i32) -> Result<bool, DbErr> {
        let row = enrollment::Entity::find_by_id((user_id, course_id)).one(conn).await?;
        Ok(row.is_some())
    }

    pub async fn find(ctx: &AppContext, user_id: i32, course_id: i32) -> AppResult<enrollment::Model> {
        enrollment::Entity::find_by_id((user_id, course_id))
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("enrollment"))
    }

    /// Toutes les inscriptions d'un utilisateur, les plus récentes d'abord
    pub async fn list_for_user(ctx: &AppContext, user_id: i32) -> AppResult<Vec<enrollment::Model>> {
        let rows = enrollment::Entity::find()
            .filter(enrollment::Column::UserId.eq(user_id))
            .order_by_desc(enrollment::Column::EnrolledAt)
            .order_by_asc(enrollment::Column::CourseId)
            .all(&ctx.db)
            .await?;
        Ok(rows)
    }

    /// Pas de route utilisateur vers cette opération: seul le rollup de
    /// progression ou un ADMIN peuvent terminer une inscription
    pub async fn mark_completed(
        ctx: &AppContext,
        user_id: i32,
        course_id: i32,
        source: CompletionSource<'_>,
    ) -> AppResult<enrollment::Model> {
        let current = Self::find(ctx, user_id, course_id).await?;

        match source {
            CompletionSource::Rollup => {
                let ratio = ProgressService::course_completion_ratio(ctx, user_id, course_id).await?;
                if ratio < 1.0 {
                    return Err(AppError::invalid("Course is not fully completed"));
                }
            }
            CompletionSource::AdminOverride { actor } => {
                if !authorize(actor, Role::Admin) {
                    return Err(AuthError::Forbidden.into());
                }
            }
        }

        if current.completed {
            return Ok(current);
        }

        let now = ctx.now();
        enrollment::Entity::update_many()
            .col_expr(enrollment::Column::Completed, Expr::value(true))
            .col_expr(enrollment::Column::CompletedAt, Expr::value(Some(now)))
            .filter(enrollment::Column::UserId.eq(user_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .filter(enrollment::Column::Completed.eq(false))
            .exec(&ctx.db)
            .await?;

        match source {
            CompletionSource::Rollup => info!(user_id, course_id, "course completed"),
            CompletionSource::AdminOverride { actor } => {
                info!(user_id, course_id, actor_id = actor.id, "course completion overridden")
            }
        }

        Self::find(ctx, user_id, course_id).await
    }

    /// ADMIN uniquement. Enregistre un statut, aucun paiement n'est traité.
    pub async fn record_payment_status(
        ctx: &AppContext,
        actor: &users::Model,
        user_id: i32,
        course_id: i32,
        status: PaymentStatus,
    ) -> AppResult<enrollment::Model> {
        if !authorize(actor, Role::Admin) {
            return Err(AuthError::Forbidden.into());
        }

        let current = Self::find(ctx, user_id, course_id).await?;
        let mut active_model: enrollment::ActiveModel = current.into();
        active_model.payment_status = Set(status);
        let updated = active_model.update(&ctx.db).await?;

        info!(user_id, course_id, actor_id = actor.id, status = ?status, "payment status recorded");
        Ok(updated)
    }
}
