/// Last-request-wins coordination for feed refreshes.
///
/// Every refresh takes a ticket when it starts. When it resolves, its result
/// is applied only if no refresh with a newer ticket has been applied in the
/// meantime; otherwise it is discarded and the caller gets the newer snapshot.
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::metrics;
use crate::models::{Feed, Session};

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Applied(Feed),
    /// A newer refresh won; carries the snapshot it applied.
    Stale(Option<Feed>),
}

impl RefreshOutcome {
    pub fn is_stale(&self) -> bool {
        matches!(self, RefreshOutcome::Stale(_))
    }

    /// The feed a caller should show.
    pub fn into_feed(self) -> Feed {
        match self {
            RefreshOutcome::Applied(feed) => feed,
            RefreshOutcome::Stale(snapshot) => snapshot.unwrap_or_default(),
        }
    }
}

#[derive(Default)]
struct Applied {
    ticket: u64,
    feed: Option<Feed>,
}

#[derive(Default)]
pub struct FeedRefresher {
    issued: AtomicU64,
    applied: RwLock<Applied>,
}

impl FeedRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh<F>(&self, aggregation: F) -> Result<RefreshOutcome>
    where
        F: Future<Output = Result<Feed>>,
    {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = aggregation.await;

        let mut applied = self.applied.write().await;
        if applied.ticket > ticket {
            debug!(
                "Discarding refresh #{} (#{} already applied)",
                ticket, applied.ticket
            );
            metrics::record_stale_refresh();
            return Ok(RefreshOutcome::Stale(applied.feed.clone()));
        }

        let feed = result?;
        applied.ticket = ticket;
        applied.feed = Some(feed.clone());
        Ok(RefreshOutcome::Applied(feed))
    }

    pub async fn snapshot(&self) -> Option<Feed> {
        self.applied.read().await.feed.clone()
    }
}

type SessionKey = (String, Option<String>);

/// One refresher per viewer session (viewer id + token), so a refresh only
/// ever hands back a snapshot built with the caller's own credentials.
///
/// Never holds more than `capacity` entries. When every tracked session has
/// a refresh in flight, new sessions get an untracked refresher that simply
/// applies its own result.
pub struct FeedRefreshers {
    inner: DashMap<SessionKey, Arc<FeedRefresher>>,
    capacity: usize,
}

impl FeedRefreshers {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn for_session(&self, session: &Session) -> Arc<FeedRefresher> {
        let key = (session.viewer_id.clone(), session.token.clone());
        if let Some(existing) = self.inner.get(&key) {
            return existing.clone();
        }

        if self.inner.len() >= self.capacity {
            // drop sessions with no refresh in flight
            self.inner.retain(|_, r| Arc::strong_count(r) > 1);
            if self.inner.len() >= self.capacity {
                debug!(
                    "Refresher map full ({}), not tracking {}",
                    self.capacity, session.viewer_id
                );
                return Arc::new(FeedRefresher::new());
            }
        }

        self.inner
            .entry(key)
            .or_insert_with(|| Arc::new(FeedRefresher::new()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for FeedRefreshers {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{parse_timestamp, Post};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn feed_with(id: &str) -> Feed {
        Feed {
            posts: vec![Post {
                id: id.to_string(),
                author_id: "u1".to_string(),
                created_at: parse_timestamp("2024-01-01").unwrap(),
                content: serde_json::Map::new(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_refresh_applied() {
        let refresher = FeedRefresher::new();
        let outcome = refresher
            .refresh(async { Ok(feed_with("p1")) })
            .await
            .unwrap();

        assert!(!outcome.is_stale());
        assert_eq!(refresher.snapshot().await, Some(feed_with("p1")));
    }

    #[tokio::test]
    async fn test_slow_older_refresh_is_discarded() {
        let refresher = Arc::new(FeedRefresher::new());
        let (release_old, old_gate) = oneshot::channel::<()>();

        let old = {
            let refresher = refresher.clone();
            tokio::spawn(async move {
                refresher
                    .refresh(async move {
                        let _ = old_gate.await;
                        Ok(feed_with("old"))
                    })
                    .await
            })
        };

        // let the old refresh take its ticket first
        tokio::time::sleep(Duration::from_millis(20)).await;

        let newer = refresher
            .refresh(async { Ok(feed_with("new")) })
            .await
            .unwrap();
        assert_eq!(newer, RefreshOutcome::Applied(feed_with("new")));

        release_old.send(()).unwrap();
        let older = old.await.unwrap().unwrap();

        assert_eq!(older, RefreshOutcome::Stale(Some(feed_with("new"))));
        assert_eq!(older.into_feed(), feed_with("new"));
        assert_eq!(refresher.snapshot().await, Some(feed_with("new")));
    }

    #[tokio::test]
    async fn test_stale_error_is_swallowed() {
        let refresher = Arc::new(FeedRefresher::new());
        let (release_old, old_gate) = oneshot::channel::<()>();

        let old = {
            let refresher = refresher.clone();
            tokio::spawn(async move {
                refresher
                    .refresh(async move {
                        let _ = old_gate.await;
                        Err(AppError::Upstream("late failure".into()))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        refresher
            .refresh(async { Ok(feed_with("new")) })
            .await
            .unwrap();
        release_old.send(()).unwrap();

        assert!(old.await.unwrap().unwrap().is_stale());
    }

    #[tokio::test]
    async fn test_current_error_propagates_and_keeps_snapshot() {
        let refresher = FeedRefresher::new();
        refresher
            .refresh(async { Ok(feed_with("p1")) })
            .await
            .unwrap();

        let err = refresher
            .refresh(async { Err(AppError::InvalidInput("viewer id is required".into())) })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(refresher.snapshot().await, Some(feed_with("p1")));
    }

    fn session(viewer: &str, token: &str) -> Session {
        Session::new(viewer, Some(token.to_string()))
    }

    #[tokio::test]
    async fn test_refreshers_shared_per_session() {
        let refreshers = FeedRefreshers::new(10);
        let a = refreshers.for_session(&session("u1", "tok-a"));
        let b = refreshers.for_session(&session("u1", "tok-a"));
        let c = refreshers.for_session(&session("u2", "tok-a"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(refreshers.len(), 2);
    }

    #[tokio::test]
    async fn test_same_viewer_different_token_not_shared() {
        let refreshers = FeedRefreshers::new(10);
        let a = refreshers.for_session(&session("u1", "tok-a"));
        let b = refreshers.for_session(&session("u1", "tok-b"));
        assert!(!Arc::ptr_eq(&a, &b));

        a.refresh(async { Ok(feed_with("from-a")) }).await.unwrap();
        assert_eq!(b.snapshot().await, None);

        let outcome = b.refresh(async { Ok(feed_with("from-b")) }).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Applied(feed_with("from-b")));
    }

    #[test]
    fn test_idle_sessions_evicted_at_capacity() {
        let refreshers = FeedRefreshers::new(2);
        drop(refreshers.for_session(&session("u1", "t")));
        let held = refreshers.for_session(&session("u2", "t"));
        let _u3 = refreshers.for_session(&session("u3", "t"));

        // u1 was idle and dropped; u2 is still held by a caller
        assert_eq!(refreshers.len(), 2);
        assert!(Arc::ptr_eq(&held, &refreshers.for_session(&session("u2", "t"))));
    }

    #[test]
    fn test_busy_map_never_exceeds_capacity() {
        let refreshers = FeedRefreshers::new(2);
        let _u1 = refreshers.for_session(&session("u1", "t"));
        let _u2 = refreshers.for_session(&session("u2", "t"));

        let untracked = refreshers.for_session(&session("u3", "t"));
        let again = refreshers.for_session(&session("u3", "t"));

        assert_eq!(refreshers.len(), 2);
        assert!(!Arc::ptr_eq(&untracked, &again));
    }
}
