use actix_web::{post, web, HttpRequest, HttpResponse};
use std::sync::Arc;
use tracing::debug;

use super::bearer_token;
use crate::clients::SocialBackend;
use crate::error::{AppError, Result};
use crate::models::{FeedRequest, FeedResponse, Session};
use crate::services::{FeedAggregator, FeedRefreshers};

pub struct FeedHandlerState {
    pub backend: Arc<dyn SocialBackend>,
    pub aggregator: FeedAggregator,
    pub refreshers: FeedRefreshers,
}

impl FeedHandlerState {
    pub fn new(backend: Arc<dyn SocialBackend>, aggregator: FeedAggregator) -> Self {
        Self {
            backend,
            aggregator,
            refreshers: FeedRefreshers::default(),
        }
    }
}

/// Aggregate the viewer's feed. A request overtaken by a newer refresh of
/// the same session (viewer id and token) answers with the newer feed and `stale: true`.
#[post("")]
pub async fn get_feed(
    http_req: HttpRequest,
    body: web::Json<FeedRequest>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let token = bearer_token(&http_req)?;
    let viewer_id = body.into_inner().user_id;
    if viewer_id.trim().is_empty() {
        return Err(AppError::InvalidInput("userId is required".to_string()));
    }

    debug!("Getting feed for user: {}", viewer_id);

    let session = Session::new(viewer_id, Some(token));
    let refresher = state.refreshers.for_session(&session);
    let outcome = refresher
        .refresh(state.aggregator.load_feed(&session, state.backend.as_ref()))
        .await?;

    let stale = outcome.is_stale();
    let feed = outcome.into_feed();

    Ok(HttpResponse::Ok().json(FeedResponse {
        posts: feed.posts,
        report: feed.report,
        stale,
    }))
}
