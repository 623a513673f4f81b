use actix_web::{get, http::header, web, HttpRequest, HttpResponse};

use crate::error::{AppError, Result};
use crate::metrics;

pub mod feed;
pub mod follow;

pub use feed::{get_feed, FeedHandlerState};
pub use follow::set_follow;

/// Register all routes. `FeedHandlerState` and `FollowService` must be
/// provided as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(metrics_endpoint)
        .service(web::scope("/api/v1/feed").service(get_feed))
        .service(web::scope("/api/v1/follow").service(set_follow));
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/metrics")]
pub async fn metrics_endpoint() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::render())
}

/// Token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(req: &HttpRequest) -> Result<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))
}
