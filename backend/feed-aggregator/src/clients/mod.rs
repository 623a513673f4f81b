/// Clients for the social backend the feed is built from.
///
/// The aggregator only depends on the traits below; `SocialApiClient` is the
/// HTTP implementation used by the service binary.
use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Post, Relationship, Session};

pub mod social_api;

pub use social_api::SocialApiClient;

/// Source of an author's posts, already bound to a viewer session.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts_by_author(&self, author_id: &str) -> Result<Vec<Post>>;
}

/// Social backend calls used by the feed and follow flows.
#[async_trait]
pub trait SocialBackend: Send + Sync {
    async fn fetch_followers(&self, session: &Session) -> Result<Vec<Relationship>>;

    async fn fetch_following(&self, session: &Session) -> Result<Vec<Relationship>>;

    async fn fetch_posts_by_author(&self, session: &Session, author_id: &str)
        -> Result<Vec<Post>>;

    async fn set_follow_state(
        &self,
        session: &Session,
        target_id: &str,
        desired: bool,
    ) -> Result<()>;
}

/// Binds a backend to a session so it can feed the aggregator.
pub struct SessionPosts<'a, B: ?Sized> {
    backend: &'a B,
    session: &'a Session,
}

impl<'a, B: SocialBackend + ?Sized> SessionPosts<'a, B> {
    pub fn new(backend: &'a B, session: &'a Session) -> Self {
        Self { backend, session }
    }
}

#[async_trait]
impl<B: SocialBackend + ?Sized> PostSource for SessionPosts<'_, B> {
    async fn fetch_posts_by_author(&self, author_id: &str) -> Result<Vec<Post>> {
        self.backend
            .fetch_posts_by_author(self.session, author_id)
            .await
    }
}
