// ============================================================================
// SERVICE : PROGRESSION
// ============================================================================
//
// Description:
//   Suivi des leçons et modules par utilisateur. Les lignes de progression
//   sont créées au premier accès (upsert atomique) puis mises à jour sur
//   place. Les ratios ne sont jamais stockés: ils sont recalculés à chaque
//   lecture, dans une seule transaction par appel.
//
// Règles:
//   - ratio module = leçons terminées / leçons du module (0 si vide)
//   - ratio cours  = moyenne des ratios de modules (0 sans module)
//   - total_lessons = somme des leçons de tous les modules
//   - écrire une progression exige d'être inscrit au cours
//
// ============================================================================

use chrono::NaiveDateTime;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::context::AppContext;
use crate::errors::{AppError, AppResult, AuthError};
use crate::models::{course, course_lesson, course_module, enrollment, lesson_progress, module_progress};
use crate::services::enrollment_service::{CompletionSource, EnrollmentService};

pub struct ProgressService;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleProgressSummary {
    pub module_id: i32,
    pub title: String,
    pub order: i32,
    pub total_lessons: u64,
    pub completed_lessons: u64,
    pub ratio: f64,
    pub completed: bool,
    pub last_accessed: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseProgressReport {
    pub user_id: i32,
    pub course_id: i32,
    pub ratio: f64,
    pub total_lessons: u64,
    pub completed_lessons: u64,
    pub enrolled: bool,
    pub enrollment_completed: bool,
    pub modules: Vec<ModuleProgressSummary>,
}

/// completed / total, 0 pour un total nul
pub fn completion_ratio(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed.min(total) as f64 / total as f64
}

/// Moyenne simple, 0 pour une liste vide
pub fn mean_ratio(ratios: &[f64]) -> f64 {
    if ratios.is_empty() {
        return 0.0;
    }
    ratios.iter().sum::<f64>() / ratios.len() as f64
}

fn is_complete(ratio: f64) -> bool {
    ratio >= 1.0
}

impl ProgressService {
    /// Premier accès: crée les lignes leçon + module (completed=false).
    /// Accès suivants: met à jour last_accessed uniquement.
    pub async fn record_lesson_access(
        ctx: &AppContext,
        user_id: i32,
        lesson_id: i32,
    ) -> AppResult<lesson_progress::Model> {
        let (lesson, module) = Self::enrolled_lesson(ctx, user_id, lesson_id).await?;
        let now = ctx.now();

        let row = lesson_progress::ActiveModel {
            user_id: Set(user_id),
            lesson_id: Set(lesson.id),
            completed: Set(false),
            last_accessed: Set(now),
        };
        lesson_progress::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([lesson_progress::Column::UserId, lesson_progress::Column::LessonId])
                    .update_column(lesson_progress::Column::LastAccessed)
                    .to_owned(),
            )
            .exec_without_returning(&ctx.db)
            .await?;

        touch_module(&ctx.db, user_id, module.id, now).await?;

        Self::lesson_row(ctx, user_id, lesson.id).await
    }

    /// Idempotent: une leçon déjà terminée reste terminée
    pub async fn complete_lesson(
        ctx: &AppContext,
        user_id: i32,
        lesson_id: i32,
    ) -> AppResult<lesson_progress::Model> {
        let (lesson, module) = Self::enrolled_lesson(ctx, user_id, lesson_id).await?;
        let now = ctx.now();

        let row = lesson_progress::ActiveModel {
            user_id: Set(user_id),
            lesson_id: Set(lesson.id),
            completed: Set(true),
            last_accessed: Set(now),
        };
        lesson_progress::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([lesson_progress::Column::UserId, lesson_progress::Column::LessonId])
                    .update_columns([
                        lesson_progress::Column::Completed,
                        lesson_progress::Column::LastAccessed,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&ctx.db)
            .await?;

        touch_module(&ctx.db, user_id, module.id, now).await?;

        info!(user_id, lesson_id, "lesson completed");
        Self::lesson_row(ctx, user_id, lesson.id).await
    }

    pub async fn module_completion_ratio(ctx: &AppContext, user_id: i32, module_id: i32) -> AppResult<f64> {
        Ok(Self::module_progress(ctx, user_id, module_id).await?.ratio)
    }

    pub async fn module_progress(
        ctx: &AppContext,
        user_id: i32,
        module_id: i32,
    ) -> AppResult<ModuleProgressSummary> {
        let txn = ctx.db.begin().await?;

        let module = course_module::Entity::find_by_id(module_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("module"))?;
        let mut summaries = summarize_modules(&txn, user_id, vec![module]).await?;

        txn.commit().await?;
        summaries.pop().ok_or(AppError::NotFound("module"))
    }

    pub async fn course_completion_ratio(ctx: &AppContext, user_id: i32, course_id: i32) -> AppResult<f64> {
        Ok(Self::course_progress(ctx, user_id, course_id).await?.ratio)
    }

    pub async fn total_lessons(ctx: &AppContext, course_id: i32) -> AppResult<u64> {
        let found = course::Entity::find_by_id(course_id).one(&ctx.db).await?;
        if found.is_none() {
            return Err(AppError::NotFound("course"));
        }
        Ok(count_course_lessons(&ctx.db, course_id).await?)
    }

    /// Rapport complet, lu dans une seule transaction
    pub async fn course_progress(
        ctx: &AppContext,
        user_id: i32,
        course_id: i32,
    ) -> AppResult<CourseProgressReport> {
        let txn = ctx.db.begin().await?;

        let found = course::Entity::find_by_id(course_id).one(&txn).await?;
        if found.is_none() {
            return Err(AppError::NotFound("course"));
        }

        let modules = course_module::Entity::find()
            .filter(course_module::Column::CourseId.eq(course_id))
            .order_by_asc(course_module::Column::Order)
            .all(&txn)
            .await?;
        let summaries = summarize_modules(&txn, user_id, modules).await?;
        let total_lessons = count_course_lessons(&txn, course_id).await?;

        let enrollment = enrollment::Entity::find_by_id((user_id, course_id)).one(&txn).await?;

        txn.commit().await?;

        let ratios: Vec<f64> = summaries.iter().map(|m| m.ratio).collect();
        Ok(CourseProgressReport {
            user_id,
            course_id,
            ratio: mean_ratio(&ratios),
            total_lessons,
            completed_lessons: summaries.iter().map(|m| m.completed_lessons).sum(),
            enrolled: enrollment.is_some(),
            enrollment_completed: enrollment.map(|e| e.completed).unwrap_or(false),
            modules: summaries,
        })
    }

    /// Reporte les ratios lus sur les drapeaux stockés: modules à 1.0
    /// marqués terminés, inscription terminée si le cours est à 1.0.
    /// Rien n'est jamais remis à false.
    pub async fn sync_completion(
        ctx: &AppContext,
        user_id: i32,
        course_id: i32,
    ) -> AppResult<CourseProgressReport> {
        if !EnrollmentService::is_enrolled(&ctx.db, user_id, course_id).await? {
            return Err(AuthError::NotEnrolled.into());
        }

        let mut report = Self::course_progress(ctx, user_id, course_id).await?;
        let now = ctx.now();

        for module in report.modules.iter_mut().filter(|m| is_complete(m.ratio) && !m.completed) {
            let row = module_progress::ActiveModel {
                user_id: Set(user_id),
                module_id: Set(module.module_id),
                completed: Set(true),
                last_accessed: Set(now),
            };
            module_progress::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([module_progress::Column::UserId, module_progress::Column::ModuleId])
                        .update_column(module_progress::Column::Completed)
                        .to_owned(),
                )
                .exec_without_returning(&ctx.db)
                .await?;

            module.completed = true;
            module.last_accessed.get_or_insert(now);
            info!(user_id, module_id = module.module_id, "module completed");
        }

        if is_complete(report.ratio) && !report.enrollment_completed {
            EnrollmentService::mark_completed(ctx, user_id, course_id, CompletionSource::Rollup).await?;
            report.enrollment_completed = true;
        }

        Ok(report)
    }

    async fn enrolled_lesson(
        ctx: &AppContext,
        user_id: i32,
        lesson_id: i32,
    ) -> AppResult<(course_lesson::Model, course_module::Model)> {
        let lesson = course_lesson::Entity::find_by_id(lesson_id)
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("lesson"))?;
        let module = course_module::Entity::find_by_id(lesson.module_id)
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("module"))?;

        if !EnrollmentService::is_enrolled(&ctx.db, user_id, module.course_id).await? {
            return Err(AuthError::NotEnrolled.into());
        }

        Ok((lesson, module))
    }

    async fn lesson_row(ctx: &AppContext, user_id: i32, lesson_id: i32) -> AppResult<lesson_progress::Model> {
        lesson_progress::Entity::find_by_id((user_id, lesson_id))
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("lesson progress"))
    }
}

async fn touch_module<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    module_id: i32,
    now: NaiveDateTime,
) -> Result<(), DbErr> {
    let row = module_progress::ActiveModel {
        user_id: Set(user_id),
        module_id: Set(module_id),
        completed: Set(false),
        last_accessed: Set(now),
    };
    module_progress::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([module_progress::Column::UserId, module_progress::Column::ModuleId])
                .update_column(module_progress::Column::LastAccessed)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn count_course_lessons<C: ConnectionTrait>(conn: &C, course_id: i32) -> Result<u64, DbErr> {
    course_lesson::Entity::find()
        .inner_join(course_module::Entity)
        .filter(course_module::Column::CourseId.eq(course_id))
        .count(conn)
        .await
}

// Trois requêtes quel que soit le nombre de modules
async fn summarize_modules<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    modules: Vec<course_module::Model>,
) -> Result<Vec<ModuleProgressSummary>, DbErr> {
    if modules.is_empty() {
        return Ok(Vec::new());
    }
    let module_ids: Vec<i32> = modules.iter().map(|m| m.id).collect();

    let lessons = course_lesson::Entity::find()
        .filter(course_lesson::Column::ModuleId.is_in(module_ids.clone()))
        .all(conn)
        .await?;
    let lesson_ids: Vec<i32> = lessons.iter().map(|l| l.id).collect();

    let completed: HashSet<i32> = if lesson_ids.is_empty() {
        HashSet::new()
    } else {
        lesson_progress::Entity::find()
            .filter(lesson_progress::Column::UserId.eq(user_id))
            .filter(lesson_progress::Column::Completed.eq(true))
            .filter(lesson_progress::Column::LessonId.is_in(lesson_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| p.lesson_id)
            .collect()
    };

    let module_rows: HashMap<i32, module_progress::Model> = module_progress::Entity::find()
        .filter(module_progress::Column::UserId.eq(user_id))
        .filter(module_progress::Column::ModuleId.is_in(module_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.module_id, p))
        .collect();

    let summaries = modules
        .into_iter()
        .map(|module| {
            let module_lessons: Vec<&course_lesson::Model> =
                lessons.iter().filter(|l| l.module_id == module.id).collect();
            let total = module_lessons.len() as u64;
            let done = module_lessons.iter().filter(|l| completed.contains(&l.id)).count() as u64;
            let stored = module_rows.get(&module.id);

            ModuleProgressSummary {
                module_id: module.id,
                title: module.title,
                order: module.order,
                total_lessons: total,
                completed_lessons: done,
                ratio: completion_ratio(done, total),
                completed: stored.map(|p| p.completed).unwrap_or(false),
                last_accessed: stored.map(|p| p.last_accessed),
            }
        })
        .collect();

    Ok(summaries)
}
