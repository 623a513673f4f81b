pub mod aggregator;
pub mod follow;
pub mod refresh;

pub use aggregator::{author_ids, compute_feed, sort_newest_first, FeedAggregator};
pub use follow::FollowService;
pub use refresh::{FeedRefresher, FeedRefreshers, RefreshOutcome};
