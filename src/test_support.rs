// Outils partagés par les tests: contexte SQLite en mémoire, horloge
// manuelle, boîte d'envoi des emails et jeux de données.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::Settings;
use crate::context::AppContext;
use crate::db;
use crate::models::dto::RegisterRequest;
use crate::models::metadata::CreationMetadata;
use crate::models::role::Role;
use crate::models::{course, course_lesson, course_module, users};
use crate::services::mail_service::{ChannelMailer, Mailer, OutgoingEmail};
use crate::utils::clock::ManualClock;
use crate::utils::password;

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub ctx: AppContext,
    pub clock: Arc<ManualClock>,
    pub outbox: UnboundedReceiver<OutgoingEmail>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub async fn test_app() -> TestApp {
    let (mailer, outbox) = ChannelMailer::new();
    let (ctx, clock) = context_with_mailer(Arc::new(mailer)).await;
    TestApp { ctx, clock, outbox }
}

pub async fn context_with_mailer(mailer: Arc<dyn Mailer>) -> (AppContext, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let db = db::test_connection().await;
    let ctx = AppContext::new(db, mailer, clock.clone(), Settings::for_tests());
    (ctx, clock)
}

pub fn register_request(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: PASSWORD.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
    }
}

/// Insère directement un utilisateur confirmé avec le rôle voulu
pub async fn create_user(ctx: &AppContext, username: &str, role: Role) -> users::Model {
    let meta = CreationMetadata::new(ctx.now());
    users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password_hash: Set(password::hash_password(PASSWORD, ctx.settings.password_iterations).unwrap()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        role: Set(role),
        email_confirmed: Set(true),
        email_confirmed_at: Set(Some(meta.created_at)),
        token_version: Set(0),
        bio: Set(None),
        is_csp: Set(false),
        is_cst: Set(role == Role::Trainer),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await
    .unwrap()
}

pub struct SeededCourse {
    pub course: course::Model,
    pub modules: Vec<(course_module::Model, Vec<course_lesson::Model>)>,
}

impl SeededCourse {
    pub fn module(&self, index: usize) -> &course_module::Model {
        &self.modules[index].0
    }

    pub fn lesson(&self, module: usize, lesson: usize) -> i32 {
        self.modules[module].1[lesson].id
    }
}

/// Un cours avec `lessons_per_module[i]` leçons dans le module i
pub async fn seed_course(
    ctx: &AppContext,
    title: &str,
    price: Decimal,
    lessons_per_module: &[usize],
) -> SeededCourse {
    let meta = CreationMetadata::new(ctx.now());
    let course = course::ActiveModel {
        title: Set(title.to_string()),
        summary: Set(None),
        description: Set(None),
        price: Set(price),
        level: Set(None),
        duration: Set(None),
        category_id: Set(None),
        creator_id: Set(None),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await
    .unwrap();

    let mut modules = Vec::new();
    for (module_index, lesson_count) in lessons_per_module.iter().enumerate() {
        let module = course_module::ActiveModel {
            course_id: Set(course.id),
            title: Set(format!("Module {}", module_index + 1)),
            description: Set(None),
            order: Set(module_index as i32 + 1),
            ..Default::default()
        }
        .insert(&ctx.db)
        .await
        .unwrap();

        let mut lessons = Vec::new();
        for lesson_index in 0..*lesson_count {
            let lesson = course_lesson::ActiveModel {
                module_id: Set(module.id),
                title: Set(format!("Lesson {}.{}", module_index + 1, lesson_index + 1)),
                content: Set(None),
                order: Set(lesson_index as i32 + 1),
                duration_minutes: Set(Some(10)),
                ..Default::default()
            }
            .insert(&ctx.db)
            .await
            .unwrap();
            lessons.push(lesson);
        }
        modules.push((module, lessons));
    }

    SeededCourse { course, modules }
}
