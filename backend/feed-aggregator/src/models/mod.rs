use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Authenticated viewer context for one call into the social backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub viewer_id: String,
    pub token: Option<String>,
}

impl Session {
    pub fn new(viewer_id: impl Into<String>, token: Option<String>) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            token,
        }
    }
}

/// A follower or following edge. `request_status == true` means accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    #[serde(default)]
    pub request_status: bool,
}

impl Relationship {
    pub fn accepted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            request_status: true,
        }
    }

    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            request_status: false,
        }
    }
}

/// A post as returned by the backend. Content fields are opaque and kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(alias = "_id")]
    pub id: String,
    /// Empty when the backend omits it; the client fills in the requested author.
    #[serde(default, alias = "userId", alias = "UserId")]
    pub author_id: String,
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub content: serde_json::Map<String, serde_json::Value>,
}

/// Accepts RFC 3339, zone-less ISO datetimes (read as UTC) and bare
/// `YYYY-MM-DD` dates (midnight UTC).
fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid createdAt timestamp: {}", raw))
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorFetchFailure {
    pub author_id: String,
    pub reason: String,
}

/// Per-author fetch outcome of one aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    pub authors_requested: usize,
    pub authors_failed: Vec<AuthorFetchFailure>,
}

impl FetchReport {
    pub fn failed_count(&self) -> usize {
        self.authors_failed.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.authors_failed.is_empty()
    }
}

/// Posts ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub posts: Vec<Post>,
    pub report: FetchReport,
}

impl Feed {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn post_ids(&self) -> Vec<&str> {
        self.posts.iter().map(|p| p.id.as_str()).collect()
    }
}

/// Response wrapper used by the social backend: `{ status, data, message }`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub posts: Vec<Post>,
    pub report: FetchReport,
    /// True when this request's result was superseded by a newer refresh
    pub stale: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub user_id: String,
    pub target_id: String,
    pub follow: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub following: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_accepts_backend_field_names() {
        let post: Post = serde_json::from_value(json!({
            "_id": "p1",
            "userId": "u1",
            "createdAt": "2024-01-02T10:30:00.000Z",
            "caption": "hello",
            "likes": 3
        }))
        .unwrap();

        assert_eq!(post.id, "p1");
        assert_eq!(post.author_id, "u1");
        assert_eq!(post.content.get("caption"), Some(&json!("hello")));
        assert_eq!(post.content.get("likes"), Some(&json!(3)));
        assert!(!post.content.contains_key("_id"));
    }

    #[test]
    fn test_date_only_timestamp() {
        let ts = parse_timestamp("2024-01-03").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-03T00:00:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_zone_less_datetime_read_as_utc() {
        let ts = parse_timestamp("2024-01-02T10:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-02T10:30:00+00:00");

        let ts = parse_timestamp("2024-01-02T10:30:00.250").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_post_without_author_decodes() {
        let post: Post = serde_json::from_value(json!({
            "_id": "p3",
            "createdAt": "2024-01-02T10:30:00"
        }))
        .unwrap();

        assert_eq!(post.id, "p3");
        assert!(post.author_id.is_empty());
    }

    #[test]
    fn test_relationship_defaults_to_pending() {
        let rel: Relationship = serde_json::from_value(json!({ "id": "u2" })).unwrap();
        assert!(!rel.request_status);

        let rel: Relationship =
            serde_json::from_value(json!({ "id": "u3", "requestStatus": true })).unwrap();
        assert_eq!(rel, Relationship::accepted("u3"));
    }

    #[test]
    fn test_envelope_status() {
        let env: ApiEnvelope<Vec<Relationship>> =
            serde_json::from_value(json!({ "status": "error", "message": "nope" })).unwrap();
        assert!(!env.is_success());
        assert!(env.data.is_none());
    }
}
