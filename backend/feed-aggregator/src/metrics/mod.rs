//! Feed Aggregation Metrics
//!
//! Prometheus metrics for per-author fetches, aggregation latency and refresh races

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Duration;

static AUTHOR_FETCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_author_fetch_total",
        "Per-author post fetches (success/error)",
        &["status"]
    )
    .expect("Failed to register author fetch metric")
});

static COMPUTE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "feed_compute_duration_seconds",
        "Duration of a full feed aggregation",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register feed compute duration metric")
});

static POSTS_RETURNED: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "feed_posts_returned",
        "Number of posts in a computed feed",
        vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]
    )
    .expect("Failed to register feed posts metric")
});

static REFRESH_STALE_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "feed_refresh_stale_total",
        "Feed refreshes discarded because a newer refresh was applied first"
    )
    .expect("Failed to register stale refresh metric")
});

/// Record one per-author fetch outcome
pub fn record_author_fetch(success: bool) {
    let status = if success { "success" } else { "error" };
    AUTHOR_FETCH_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_compute(duration: Duration, posts: usize) {
    COMPUTE_DURATION_SECONDS.observe(duration.as_secs_f64());
    POSTS_RETURNED.observe(posts as f64);
}

pub fn record_stale_refresh() {
    REFRESH_STALE_TOTAL.inc();
}

/// Render the default registry in the text exposition format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_metrics() {
        record_author_fetch(true);
        record_author_fetch(false);
        record_compute(Duration::from_millis(20), 3);
        record_stale_refresh();

        let text = render();
        assert!(text.contains("feed_author_fetch_total"));
        assert!(text.contains("feed_compute_duration_seconds"));
        assert!(text.contains("feed_refresh_stale_total"));
    }
}
