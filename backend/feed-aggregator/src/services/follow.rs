use std::sync::Arc;
use tracing::info;

use crate::clients::SocialBackend;
use crate::error::{AppError, Result};
use crate::models::Session;

#[derive(Clone)]
pub struct FollowService {
    backend: Arc<dyn SocialBackend>,
}

impl FollowService {
    pub fn new(backend: Arc<dyn SocialBackend>) -> Self {
        Self { backend }
    }

    /// Follow (`desired = true`) or unfollow `target_id`; returns the new state.
    pub async fn set_follow_state(
        &self,
        session: &Session,
        target_id: &str,
        desired: bool,
    ) -> Result<bool> {
        if session.viewer_id.trim().is_empty() {
            return Err(AppError::InvalidInput("viewer id is required".to_string()));
        }
        if target_id.trim().is_empty() {
            return Err(AppError::InvalidInput("target id is required".to_string()));
        }
        if session.viewer_id == target_id {
            return Err(AppError::InvalidInput("cannot follow yourself".to_string()));
        }

        self.backend
            .set_follow_state(session, target_id, desired)
            .await?;

        info!(
            "Follow state changed: viewer={} target={} following={}",
            session.viewer_id, target_id, desired
        );
        Ok(desired)
    }
}
