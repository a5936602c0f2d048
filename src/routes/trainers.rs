use actix_web::{get, post, web, HttpResponse};

use crate::context::AppContext;
use crate::errors::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::TrainerRatingRequest;
use crate::services::rating_service::RatingService;

#[post("/{trainer_id}/ratings")]
pub async fn rate_trainer(
    ctx: web::Data<AppContext>,
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<TrainerRatingRequest>,
) -> Result<HttpResponse, AppError> {
    let rating = RatingService::rate_trainer(&ctx, &auth_user.user, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(rating))
}

#[get("/{trainer_id}/rating")]
pub async fn trainer_rating(
    ctx: web::Data<AppContext>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let summary = RatingService::trainer_rating_summary(&ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub fn trainers_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/trainers")
            .service(rate_trainer)
            .service(trainer_rating),
    );
}
