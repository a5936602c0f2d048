//pour les requêtes et réponses structurées de l'API
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enrollment::{self, PaymentStatus};
use super::metadata::{CreationMetadata, Timestamped};
use super::role::Role;
use super::{course, course_lesson, course_module, review, users};

// ----------------------------------------------------------------------------
// Auth
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email, length(max = 80))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 20))]
    pub first_name: String,
    #[validate(length(min = 1, max = 20))]
    pub last_name: String,
}

impl RegisterRequest {
    /// Espaces retirés avant validation: "   " doit être refusé
    pub fn trimmed(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_admin: bool,
    pub email_confirmed: bool,
    pub email_confirmed_at: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub metadata: CreationMetadata,
}

impl From<&users::Model> for UserResponse {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_admin: user.is_admin(),
            email_confirmed: user.email_confirmed,
            email_confirmed_at: user.email_confirmed_at,
            metadata: user.metadata(),
        }
    }
}

// Réponse après login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

// ----------------------------------------------------------------------------
// Catalogue
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 30))]
    pub name: String,
}

impl NewCategory {
    pub fn trimmed(self) -> Self {
        Self { name: self.name.trim().to_string() }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCourse {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub level: Option<String>,
    #[validate(range(min = 0))]
    pub duration: Option<i32>,
    pub category_id: Option<i32>,
}

impl NewCourse {
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewModule {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub description: Option<String>,
    /// Position dans le cours, ajoutée à la fin si absente
    #[validate(range(min = 1, max = 10000))]
    pub order: Option<i32>,
}

impl NewModule {
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewLesson {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub content: Option<String>,
    #[validate(range(min = 1, max = 10000))]
    pub order: Option<i32>,
    #[validate(range(min = 0))]
    pub duration_minutes: Option<i32>,
}

impl NewLesson {
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub id: i32,
    pub title: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub level: Option<String>,
    pub duration: Option<i32>,
    pub category_id: Option<i32>,
    pub creator_id: Option<i32>,
    #[serde(flatten)]
    pub metadata: CreationMetadata,
}

impl From<&course::Model> for CourseResponse {
    fn from(course: &course::Model) -> Self {
        Self {
            id: course.id,
            title: course.title.clone(),
            summary: course.summary.clone(),
            description: course.description.clone(),
            price: course.price,
            level: course.level.clone(),
            duration: course.duration,
            category_id: course.category_id,
            creator_id: course.creator_id,
            metadata: course.metadata(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModuleOutline {
    #[serde(flatten)]
    pub module: course_module::Model,
    pub lessons: Vec<course_lesson::Model>,
}

#[derive(Debug, Serialize)]
pub struct CourseOutline {
    pub course: CourseResponse,
    pub modules: Vec<ModuleOutline>,
    pub total_lessons: u64,
}

// ----------------------------------------------------------------------------
// Inscriptions
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusRequest {
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub user_id: i32,
    pub course_id: i32,
    pub enrolled_at: NaiveDateTime,
    pub completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub payment_status: PaymentStatus,
}

impl From<enrollment::Model> for EnrollmentResponse {
    fn from(row: enrollment::Model) -> Self {
        Self {
            user_id: row.user_id,
            course_id: row.course_id,
            enrolled_at: row.enrolled_at,
            completed: row.completed,
            completed_at: row.completed_at,
            payment_status: row.payment_status,
        }
    }
}

// ----------------------------------------------------------------------------
// Avis et notes
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewRequest {
    pub rating: f64,
    #[validate(length(max = 5000))]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrainerRatingRequest {
    pub rating: f64,
    #[validate(length(max = 5000))]
    pub review: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub user_id: i32,
    pub course_id: i32,
    pub rating: f64,
    pub text: Option<String>,
    #[serde(flatten)]
    pub metadata: CreationMetadata,
}

impl From<&review::Model> for ReviewResponse {
    fn from(row: &review::Model) -> Self {
        Self {
            user_id: row.user_id,
            course_id: row.course_id,
            rating: row.rating,
            text: row.text.clone(),
            metadata: row.metadata(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: u64,
}
