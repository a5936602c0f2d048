use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::info;
use validator::Validate;

use crate::context::AppContext;
use crate::errors::{AppError, AppResult, AuthError, ValidationError};
use crate::models::dto::{RatingSummary, ReviewRequest, TrainerRatingRequest};
use crate::models::role::Role;
use crate::models::{course, review, trainer_rating, users};
use crate::services::enrollment_service::EnrollmentService;

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

pub struct RatingService;

/// Intervalle fermé [0, 5]. NaN échoue aussi (contains est faux)
pub fn validate_rating(rating: f64) -> Result<f64, ValidationError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(ValidationError::InvalidRating(rating))
    }
}

pub fn summarize(ratings: &[f64]) -> RatingSummary {
    let count = ratings.len() as u64;
    let average = if ratings.is_empty() {
        0.0
    } else {
        ratings.iter().sum::<f64>() / ratings.len() as f64
    };
    RatingSummary { average, count }
}

impl RatingService {
    /// Un avis par (utilisateur, cours): un second envoi remplace le premier
    pub async fn submit_review(
        ctx: &AppContext,
        user_id: i32,
        course_id: i32,
        request: ReviewRequest,
    ) -> AppResult<review::Model> {
        // La note est vérifiée avant toute écriture, jamais ramenée dans l'intervalle
        let rating = validate_rating(request.rating)?;
        request.validate()?;

        let found = course::Entity::find_by_id(course_id).one(&ctx.db).await?;
        if found.is_none() {
            return Err(AppError::NotFound("course"));
        }
        if !EnrollmentService::is_enrolled(&ctx.db, user_id, course_id).await? {
            return Err(AuthError::NotEnrolled.into());
        }

        let now = ctx.now();
        let row = review::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            rating: Set(rating),
            text: Set(request.text),
            created_at: Set(now),
            updated_at: Set(now),
        };
        review::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([review::Column::UserId, review::Column::CourseId])
                    .update_columns([review::Column::Rating, review::Column::Text, review::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&ctx.db)
            .await?;

        info!(user_id, course_id, rating, "review submitted");

        review::Entity::find_by_id((user_id, course_id))
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("review"))
    }

    pub async fn course_reviews(ctx: &AppContext, course_id: i32) -> AppResult<Vec<review::Model>> {
        let rows = review::Entity::find()
            .filter(review::Column::CourseId.eq(course_id))
            .order_by_desc(review::Column::UpdatedAt)
            .all(&ctx.db)
            .await?;
        Ok(rows)
    }

    /// 0 quand le cours n'a aucun avis
    pub async fn average_course_rating(ctx: &AppContext, course_id: i32) -> AppResult<f64> {
        Ok(Self::course_rating_summary(ctx, course_id).await?.average)
    }

    pub async fn course_rating_summary(ctx: &AppContext, course_id: i32) -> AppResult<RatingSummary> {
        let txn = ctx.db.begin().await?;

        let found = course::Entity::find_by_id(course_id).one(&txn).await?;
        if found.is_none() {
            return Err(AppError::NotFound("course"));
        }

        let ratings: Vec<f64> = review::Entity::find()
            .filter(review::Column::CourseId.eq(course_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|r| r.rating)
            .collect();

        txn.commit().await?;
        Ok(summarize(&ratings))
    }

    /// La cible doit avoir le rôle TRAINER; on ne se note pas soi-même
    pub async fn rate_trainer(
        ctx: &AppContext,
        rater: &users::Model,
        trainer_id: i32,
        request: TrainerRatingRequest,
    ) -> AppResult<trainer_rating::Model> {
        let rating = validate_rating(request.rating)?;
        request.validate()?;

        if rater.id == trainer_id {
            return Err(AppError::invalid("You cannot rate yourself"));
        }
        Self::find_trainer(&ctx.db, trainer_id).await?;

        let now = ctx.now();
        let row = trainer_rating::ActiveModel {
            rater_id: Set(rater.id),
            trainer_id: Set(trainer_id),
            rating: Set(rating),
            review: Set(request.review),
            created_at: Set(now),
            updated_at: Set(now),
        };
        trainer_rating::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([trainer_rating::Column::RaterId, trainer_rating::Column::TrainerId])
                    .update_columns([
                        trainer_rating::Column::Rating,
                        trainer_rating::Column::Review,
                        trainer_rating::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&ctx.db)
            .await?;

        info!(rater_id = rater.id, trainer_id, rating, "trainer rated");

        trainer_rating::Entity::find_by_id((rater.id, trainer_id))
            .one(&ctx.db)
            .await?
            .ok_or(AppError::NotFound("trainer rating"))
    }

    pub async fn average_trainer_rating(ctx: &AppContext, trainer_id: i32) -> AppResult<f64> {
        Ok(Self::trainer_rating_summary(ctx, trainer_id).await?.average)
    }

    pub async fn trainer_rating_summary(ctx: &AppContext, trainer_id: i32) -> AppResult<RatingSummary> {
        let txn = ctx.db.begin().await?;

        Self::find_trainer(&txn, trainer_id).await?;
        let ratings: Vec<f64> = trainer_rating::Entity::find()
            .filter(trainer_rating::Column::TrainerId.eq(trainer_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|r| r.rating)
            .collect();

        txn.commit().await?;
        Ok(summarize(&ratings))
    }

    async fn find_trainer<C: ConnectionTrait>(conn: &C, trainer_id: i32) -> AppResult<users::Model> {
        users::Entity::find_by_id(trainer_id)
            .filter(users::Column::Role.eq(Role::Trainer))
            .one(conn)
            .await?
            .ok_or(AppError::NotFound("trainer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog_service::CatalogService;
    use crate::test_support;
    use rstest::rstest;
    use rust_decimal::Decimal;

    #[rstest]
    #[case(0.0, true)]
    #[case(5.0, true)]
    #[case(2.5, true)]
    #[case(5.1, false)]
    #[case(-0.1, false)]
    #[case(f64::NAN, false)]
    #[case(f64::INFINITY, false)]
    fn test_validate_rating_bounds(#[case] rating: f64, #[case] accepted: bool) {
        assert_eq!(validate_rating(rating).is_ok(), accepted);
    }

    #[test]
    fn test_summarize_empty_is_zero() {
        assert_eq!(summarize(&[]), RatingSummary { average: 0.0, count: 0 });
        assert_eq!(summarize(&[4.0, 5.0, 3.0]), RatingSummary { average: 4.0, count: 3 });
    }

    fn review_of(rating: f64) -> ReviewRequest {
        ReviewRequest {
            rating,
            text: Some("Très clair".to_string()),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_review_is_not_persisted() {
        let app = test_support::test_app().await;
        let student = test_support::create_user(&app.ctx, "student", Role::User).await;
        let seeded = test_support::seed_course(&app.ctx, "Scrum 101", Decimal::ZERO, &[1]).await;
        let course_id = seeded.course.id;
        EnrollmentService::enroll(&app.ctx, student.id, course_id).await.unwrap();

        for rating in [5.1, -0.1] {
            let result = RatingService::submit_review(&app.ctx, student.id, course_id, review_of(rating)).await;
            assert!(matches!(
                result,
                Err(AppError::Validation(ValidationError::InvalidRating(_)))
            ));
        }
        assert_eq!(review::Entity::find().count(&app.ctx.db).await.unwrap(), 0);

        for rating in [0.0, 5.0] {
            let saved = RatingService::submit_review(&app.ctx, student.id, course_id, review_of(rating))
                .await
                .unwrap();
            assert_eq!(saved.rating, rating);
        }
        // Le second avis a remplacé le premier
        assert_eq!(review::Entity::find().count(&app.ctx.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_review_requires_enrollment() {
        let app = test_support::test_app().await;
        let student = test_support::create_user(&app.ctx, "student", Role::User).await;
        let seeded = test_support::seed_course(&app.ctx, "Scrum 101", Decimal::ZERO, &[1]).await;

        let result = RatingService::submit_review(&app.ctx, student.id, seeded.course.id, review_of(4.0)).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::NotEnrolled))));

        let missing = RatingService::submit_review(&app.ctx, student.id, 777, review_of(4.0)).await;
        assert!(matches!(missing, Err(AppError::NotFound("course"))));
    }

    #[tokio::test]
    async fn test_average_course_rating() {
        let app = test_support::test_app().await;
        let seeded = test_support::seed_course(&app.ctx, "Scrum 101", Decimal::ZERO, &[1]).await;
        let course_id = seeded.course.id;

        assert_eq!(RatingService::average_course_rating(&app.ctx, course_id).await.unwrap(), 0.0);

        for (name, rating) in [("alice", 4.0), ("bob", 5.0), ("carol", 3.0)] {
            let user = test_support::create_user(&app.ctx, name, Role::User).await;
            EnrollmentService::enroll(&app.ctx, user.id, course_id).await.unwrap();
            RatingService::submit_review(&app.ctx, user.id, course_id, review_of(rating))
                .await
                .unwrap();
        }

        let summary = RatingService::course_rating_summary(&app.ctx, course_id).await.unwrap();
        assert_eq!(summary, RatingSummary { average: 4.0, count: 3 });
    }

    #[tokio::test]
    async fn test_reviews_are_deleted_with_course() {
        let app = test_support::test_app().await;
        let admin = test_support::create_user(&app.ctx, "root", Role::Admin).await;
        let student = test_support::create_user(&app.ctx, "student", Role::User).await;
        let seeded = test_support::seed_course(&app.ctx, "Scrum 101", Decimal::ZERO, &[1]).await;
        let course_id = seeded.course.id;
        EnrollmentService::enroll(&app.ctx, student.id, course_id).await.unwrap();
        RatingService::submit_review(&app.ctx, student.id, course_id, review_of(4.5))
            .await
            .unwrap();

        CatalogService::delete_course(&app.ctx, &admin, course_id).await.unwrap();

        assert_eq!(review::Entity::find().count(&app.ctx.db).await.unwrap(), 0);
        let result = RatingService::average_course_rating(&app.ctx, course_id).await;
        assert!(matches!(result, Err(AppError::NotFound("course"))));
    }

    #[tokio::test]
    async fn test_rate_trainer() {
        let app = test_support::test_app().await;
        let trainer = test_support::create_user(&app.ctx, "coach", Role::Trainer).await;
        let student = test_support::create_user(&app.ctx, "student", Role::User).await;
        let other = test_support::create_user(&app.ctx, "other", Role::User).await;

        assert_eq!(
            RatingService::average_trainer_rating(&app.ctx, trainer.id).await.unwrap(),
            0.0
        );

        let request = |rating| TrainerRatingRequest { rating, review: None };

        let not_trainer = RatingService::rate_trainer(&app.ctx, &student, other.id, request(4.0)).await;
        assert!(matches!(not_trainer, Err(AppError::NotFound("trainer"))));

        let out_of_range = RatingService::rate_trainer(&app.ctx, &student, trainer.id, request(6.0)).await;
        assert!(matches!(
            out_of_range,
            Err(AppError::Validation(ValidationError::InvalidRating(_)))
        ));

        let itself = RatingService::rate_trainer(&app.ctx, &trainer, trainer.id, request(5.0)).await;
        assert!(matches!(itself, Err(AppError::Validation(_))));

        RatingService::rate_trainer(&app.ctx, &student, trainer.id, request(3.0)).await.unwrap();
        RatingService::rate_trainer(&app.ctx, &other, trainer.id, request(5.0)).await.unwrap();
        // Mise à jour de la note existante
        RatingService::rate_trainer(&app.ctx, &student, trainer.id, request(4.0)).await.unwrap();

        let summary = RatingService::trainer_rating_summary(&app.ctx, trainer.id).await.unwrap();
        assert_eq!(summary, RatingSummary { average: 4.5, count: 2 });
    }
}
