/// Feed aggregation: accepted followers and followings plus the viewer,
/// each author's posts fetched and merged newest first.
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::clients::{PostSource, SessionPosts, SocialBackend};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{AuthorFetchFailure, Feed, FetchReport, Post, Relationship, Session};

/// Author ids whose posts make up the viewer's feed.
///
/// Accepted followings come first, then accepted followers, each in input
/// order, then the viewer if not already present. No id appears twice.
pub fn author_ids(
    viewer_id: &str,
    followers: &[Relationship],
    following: &[Relationship],
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for rel in following.iter().chain(followers.iter()) {
        if rel.request_status && seen.insert(rel.id.as_str()) {
            ids.push(rel.id.clone());
        }
    }

    if !seen.contains(viewer_id) {
        ids.push(viewer_id.to_string());
    }

    ids
}

/// Newest first; equal timestamps keep their fetch order.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn validate_viewer(viewer_id: &str) -> Result<()> {
    if viewer_id.trim().is_empty() {
        return Err(AppError::InvalidInput("viewer id is required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FeedAggregator {
    fetch_concurrency: usize,
}

impl Default for FeedAggregator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl FeedAggregator {
    pub fn new(fetch_concurrency: usize) -> Self {
        Self {
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    pub fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency
    }

    /// Build the feed from already-fetched relationship lists.
    ///
    /// Per-author fetch failures are logged and reported in
    /// [`FetchReport`]; they never fail the call. Only an empty viewer id
    /// does, before any fetch is issued.
    #[instrument(skip(self, followers, following, source))]
    pub async fn compute_feed(
        &self,
        viewer_id: &str,
        followers: &[Relationship],
        following: &[Relationship],
        source: &dyn PostSource,
    ) -> Result<Feed> {
        validate_viewer(viewer_id)?;
        let started = Instant::now();

        let ids = author_ids(viewer_id, followers, following);
        debug!(
            "Fetching posts for {} authors (concurrency {})",
            ids.len(),
            self.fetch_concurrency
        );

        // `buffered` yields in submission order, so merge order matches `ids`.
        let results: Vec<(&String, Result<Vec<Post>>)> = stream::iter(ids.iter())
            .map(|id| async move { (id, source.fetch_posts_by_author(id).await) })
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let mut posts = Vec::new();
        let mut report = FetchReport {
            authors_requested: ids.len(),
            authors_failed: Vec::new(),
        };

        for (author_id, result) in results {
            match result {
                Ok(author_posts) => {
                    metrics::record_author_fetch(true);
                    posts.extend(author_posts);
                }
                Err(e) => {
                    metrics::record_author_fetch(false);
                    warn!("Failed to fetch posts for {}: {}", author_id, e);
                    report.authors_failed.push(AuthorFetchFailure {
                        author_id: author_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        sort_newest_first(&mut posts);
        metrics::record_compute(started.elapsed(), posts.len());

        info!(
            "Feed computed for {}: authors={} failed={} posts={}",
            viewer_id,
            report.authors_requested,
            report.failed_count(),
            posts.len()
        );

        Ok(Feed { posts, report })
    }

    /// Fetch the viewer's relationships, then aggregate.
    ///
    /// A failed followers or following lookup degrades to an empty list so
    /// the viewer still sees their own posts.
    pub async fn load_feed<B>(&self, session: &Session, backend: &B) -> Result<Feed>
    where
        B: SocialBackend + ?Sized,
    {
        validate_viewer(&session.viewer_id)?;

        let (followers, following) = futures::join!(
            backend.fetch_followers(session),
            backend.fetch_following(session)
        );

        let followers = followers.unwrap_or_else(|e| {
            warn!(
                "Followers lookup failed for {} (continuing without): {}",
                session.viewer_id, e
            );
            Vec::new()
        });
        let following = following.unwrap_or_else(|e| {
            warn!(
                "Following lookup failed for {} (continuing without): {}",
                session.viewer_id, e
            );
            Vec::new()
        });

        let source = SessionPosts::new(backend, session);
        self.compute_feed(&session.viewer_id, &followers, &following, &source)
            .await
    }
}

/// Aggregate with sequential per-author fetches.
pub async fn compute_feed(
    viewer_id: &str,
    followers: &[Relationship],
    following: &[Relationship],
    source: &dyn PostSource,
) -> Result<Feed> {
    FeedAggregator::default()
        .compute_feed(viewer_id, followers, following, source)
        .await
}
