pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

pub use clients::{PostSource, SocialApiClient, SocialBackend};
pub use models::{Feed, FetchReport, Post, Relationship, Session};
pub use services::{
    author_ids, compute_feed, FeedAggregator, FeedRefresher, FeedRefreshers, FollowService,
    RefreshOutcome,
};
