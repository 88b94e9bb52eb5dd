use crate::config::Config;
use crate::db;
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use sqlx::SqlitePool;

/// Welcome endpoint
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = Object, example = json!({
            "message": "Welcome to HRMS API",
            "version": "0.1.0",
            "docs": "/swagger-ui/index.html"
        }))
    ),
    tag = "System"
)]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to HRMS API",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/swagger-ui/index.html"
    }))
}

/// Liveness probe. Healthy only while the database answers.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database reachable", body = Object, example = json!({
            "status": "healthy",
            "service": "HRMS API",
            "environment": "dev"
        })),
        (status = 503, description = "Database unreachable", body = Object, example = json!({
            "status": "unhealthy",
            "service": "HRMS API",
            "environment": "dev"
        }))
    ),
    tag = "System"
)]
pub async fn health(pool: web::Data<SqlitePool>, config: web::Data<Config>) -> impl Responder {
    match db::ping(pool.get_ref()).await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "service": "HRMS API",
            "environment": config.environment
        })),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unhealthy",
                "service": "HRMS API",
                "environment": config.environment
            }))
        }
    }
}
