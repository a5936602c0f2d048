// ============================================================================
// SERVICE : CATALOGUE
// ============================================================================
//
// Création du contenu (catégories, cours, modules, leçons) par un ADMIN ou
// un TRAINER. Un TRAINER ne modifie que ses propres cours. Supprimer un
// cours (ADMIN) supprime en cascade modules, leçons et avis; inscriptions
// et progressions restent en place.
//
// ============================================================================

use rust_decimal::Decimal;
use sea_orm::*;
use tracing::info;
use validator::Validate;

use crate::context::AppContext;
use crate::errors::{AppError, AppResult, AuthError, ConflictError};
use crate::models::dto::{CourseOutline, CourseResponse, ModuleOutline, NewCategory, NewCourse, NewLesson, NewModule};
use crate::models::metadata::CreationMetadata;
use crate::models::role::{Role, AUTHORING_ROLES};
use crate::models::users::{self, authorize, authorize_any};
use crate::models::{category, course, course_lesson, course_module};

pub struct CatalogService;

impl CatalogService {
    pub async fn create_category(
        ctx: &AppContext,
        actor: &users::Model,
        request: NewCategory,
    ) -> AppResult<category::Model> {
        require_author(actor)?;
        let request = request.trimmed();
        request.validate()?;

        let new_category = category::ActiveModel {
            name: Set(request.name),
            ..Default::default()
        };
        let created = new_category.insert(&ctx.db).await?;

        info!(category_id = created.id, actor_id = actor.id, "category created");
        Ok(created)
    }

    pub async fn list_categories(ctx: &AppContext) -> AppResult<Vec<category::Model>> {
        let rows = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&ctx.db)
            .await?;
        Ok(rows)
    }

    pub async fn create_course(
        ctx: &AppContext,
        actor: &users::Model,
        request: NewCourse,
    ) -> AppResult<course::Model> {
        require_author(actor)?;
        let request = request.trimmed();
        request.validate()?;

        if request.price < Decimal::ZERO {
            return Err(AppError::invalid("Price cannot be negative"));
        }

        let title = request.title;
        let title_taken = course::Entity::find()
            .filter(course::Column::Title.eq(&title))
            .one(&ctx.db)
            .await?
            .is_some();
        if title_taken {
            return Err(ConflictError::DuplicateTitle.into());
        }

        if let Some(category_id) = request.category_id {
            let found = category::Entity::find_by_id(category_id).one(&ctx.db).await?;
            if found.is_none() {
                return Err(AppError::NotFound("category"));
            }
        }

        let meta = CreationMetadata::new(ctx.now());
        let new_course = course::ActiveModel {
            title: Set(title),
            summary: Set(request.summary),
            description: Set(request.description),
            price: Set(request.price),
            level: Set(request.level),
            duration: Set(request.duration),
            category_id: Set(request.category_id),
            creator_id: Set(Some(actor.id)),
            created_at: Set(meta.created_at),
            updated_at: Set(meta.updated_at),
            ..Default::default()
        };
        let created = new_course
            .insert(&ctx.db)
            .await
            .map_err(|e| conflict_as(e, ConflictError::DuplicateTitle))?;

        info!(course_id = created.id, actor_id = actor.id, "course created");
        Ok(created)
    }

    /// Sans `order`, le module est ajouté à la fin du cours
    pub async fn add_module(
        ctx: &AppContext,
        actor: &users::Model,
        course_id: i32,
        request: NewModule,
    ) -> AppResult<course_module::Model> {
        require_author(actor)?;
        let request = request.trimmed();
        request.validate()?;

        let course = Self::find_course(ctx, course_id).await?;
        ensure_can_edit(actor, &course)?;

        let order = match request.order {
            Some(order) => order,
            None => {
                let last = course_module::Entity::find()
                    .filter(course_module::Column::CourseId.eq(course_id))
                    .order_by_desc(course_module::Column::Order)
                    .one(&ctx.db)
                    .await?;
                next_order(last.map(|m| m.order))?
            }
        };

        let new_module = course_module::ActiveModel {
            course_id: Set(course_id),
            title: Set(request.title),
            description: Set(request.description),
            order: Set(order),
            ..Default::default()
        };
        let created = new_module
            .insert(&ctx.db)
            .await
            .map_err(|e| conflict_as(e, ConflictError::DuplicateOrder))?;

        info!(course_id, module_id = created.id, order, "module added");
        Ok(created)
    }

    pub async fn add_lesson(
        ctx: &AppContext,
        actor: &users::Model,
        module_id: i32,
        request: NewLesson,
    ) -> AppResult<course_lesson::Model> {
        require_author(actor)?;
        let request = request.trimmed();
        request.validate()?;

        let module = course_module::Entity::find_by_id(module_id)
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("module"))?;
        let course = Self::find_course(ctx, module.course_id).await?;
        ensure_can_edit(actor, &course)?;

        let order = match request.order {
            Some(order) => order,
            None => {
                let last = course_lesson::Entity::find()
                    .filter(course_lesson::Column::ModuleId.eq(module_id))
                    .order_by_desc(course_lesson::Column::Order)
                    .one(&ctx.db)
                    .await?;
                next_order(last.map(|l| l.order))?
            }
        };

        let new_lesson = course_lesson::ActiveModel {
            module_id: Set(module_id),
            title: Set(request.title),
            content: Set(request.content),
            order: Set(order),
            duration_minutes: Set(request.duration_minutes),
            ..Default::default()
        };
        let created = new_lesson
            .insert(&ctx.db)
            .await
            .map_err(|e| conflict_as(e, ConflictError::DuplicateOrder))?;

        info!(module_id, lesson_id = created.id, order, "lesson added");
        Ok(created)
    }

    /// ADMIN uniquement
    pub async fn delete_course(ctx: &AppContext, actor: &users::Model, course_id: i32) -> AppResult<()> {
        if !authorize(actor, Role::Admin) {
            return Err(AuthError::Forbidden.into());
        }

        let result = course::Entity::delete_by_id(course_id).exec(&ctx.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("course"));
        }

        info!(course_id, actor_id = actor.id, "course deleted");
        Ok(())
    }

    pub async fn list_courses(ctx: &AppContext) -> AppResult<Vec<course::Model>> {
        let rows = course::Entity::find()
            .order_by_asc(course::Column::Title)
            .all(&ctx.db)
            .await?;
        Ok(rows)
    }

    /// Cours avec ses modules et leçons, dans l'ordre d'affichage
    pub async fn course_outline(ctx: &AppContext, course_id: i32) -> AppResult<CourseOutline> {
        let txn = ctx.db.begin().await?;

        let course = course::Entity::find_by_id(course_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("course"))?;

        let modules = course_module::Entity::find()
            .filter(course_module::Column::CourseId.eq(course_id))
            .order_by_asc(course_module::Column::Order)
            .find_with_related(course_lesson::Entity)
            .all(&txn)
            .await?;

        txn.commit().await?;

        let mut modules: Vec<ModuleOutline> = modules
            .into_iter()
            .map(|(module, mut lessons)| {
                lessons.sort_by_key(|l| l.order);
                ModuleOutline { module, lessons }
            })
            .collect();
        modules.sort_by_key(|m| m.module.order);
        let total_lessons = modules.iter().map(|m| m.lessons.len() as u64).sum();

        Ok(CourseOutline {
            course: CourseResponse::from(&course),
            modules,
            total_lessons,
        })
    }

    async fn find_course(ctx: &AppContext, course_id: i32) -> AppResult<course::Model> {
        course::Entity::find_by_id(course_id)
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("course"))
    }
}

// Position qui suit la dernière, 1 pour un parent vide
fn next_order(last: Option<i32>) -> AppResult<i32> {
    match last {
        None => Ok(1),
        Some(order) => order
            .checked_add(1)
            .ok_or_else(|| AppError::invalid("No position left after the last one")),
    }
}

fn require_author(actor: &users::Model) -> AppResult<()> {
    if authorize_any(actor, AUTHORING_ROLES) {
        Ok(())
    } else {
        Err(AuthError::Forbidden.into())
    }
}

// ADMIN: tous les cours. TRAINER: seulement les siens.
fn ensure_can_edit(actor: &users::Model, course: &course::Model) -> AppResult<()> {
    if authorize(actor, Role::Admin) {
        return Ok(());
    }
    if authorize(actor, Role::Trainer) && course.creator_id == Some(actor.id) {
        return Ok(());
    }
    Err(AuthError::Forbidden.into())
}

fn conflict_as(err: DbErr, conflict: ConflictError) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => conflict.into(),
        _ => err.into(),
    }
}
