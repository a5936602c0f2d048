use actix_web::{get, web, HttpResponse};

use crate::context::AppContext;
use crate::models::health::HealthResponse;

#[get("/health")]
pub async fn health_check(ctx: web::Data<AppContext>) -> HttpResponse {
    match ctx.db.ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "ok",
            database: "up",
            time: ctx.clock.now(),
        }),
        Err(e) => {
            tracing::warn!(error = %e, "database ping failed");
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "degraded",
                database: "down",
                time: ctx.clock.now(),
            })
        }
    }
}
