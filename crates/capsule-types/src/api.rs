use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::FragmentPatch;
use crate::models::TagList;

// -- Capsules --

/// Body of `POST /api/capsules`.
///
/// Required fields are optional here so a missing field can be reported by
/// name instead of as a generic body error.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreateCapsuleRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub creator_name: Option<String>,
    pub creator_email: Option<String>,
    pub unlock_date: Option<String>,
    pub tags: Option<TagsInput>,
    pub is_public: Option<bool>,
}

/// Tags arrive either as a JSON array or as one comma-joined string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Joined(String),
}

impl From<TagsInput> for TagList {
    fn from(input: TagsInput) -> Self {
        match input {
            TagsInput::List(tags) => TagList::from_tags(tags),
            TagsInput::Joined(joined) => TagList::from_joined(&joined),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCapsuleResponse {
    pub message: String,
    pub capsule: CapsuleView,
}

/// Body of `PATCH /api/capsules/{id}/position`.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct UpdatePositionRequest {
    pub fragment_x: Option<f64>,
    pub fragment_y: Option<f64>,
    pub fragment_rotation: Option<f64>,
    pub fragment_scale: Option<f64>,
}

impl From<UpdatePositionRequest> for FragmentPatch {
    fn from(req: UpdatePositionRequest) -> Self {
        FragmentPatch {
            x: req.fragment_x,
            y: req.fragment_y,
            rotation: req.fragment_rotation,
            scale: req.fragment_scale,
        }
    }
}

/// What callers get to see of a capsule.
///
/// `content` and `time_remaining` are mutually exclusive: the first only
/// appears once unlocked, the second only while locked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsuleView {
    pub id: Uuid,
    pub title: String,
    pub content_type: String,
    pub creator_name: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub unlock_date: DateTime<Utc>,
    pub is_public: bool,
    pub is_unlocked: bool,
    pub fragment_x: f64,
    pub fragment_y: f64,
    pub fragment_rotation: f64,
    pub fragment_scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<TimeRemaining>,
}

/// Countdown shown on a locked capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub days: i64,
    /// 0-23
    pub hours: i64,
    /// 0-59
    pub minutes: i64,
}

impl TimeRemaining {
    /// Splits a non-negative duration; seconds are dropped.
    pub fn from_duration(remaining: Duration) -> Self {
        let secs = remaining.num_seconds().max(0);
        Self {
            days: secs / 86_400,
            hours: (secs % 86_400) / 3_600,
            minutes: (secs % 3_600) / 60,
        }
    }
}

// -- Listing --

/// Query string of `GET /api/capsules`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListCapsulesQuery {
    pub tag: Option<String>,
    pub search: Option<String>,
    pub content_type: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Query string of the unlocked/locked feeds.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapsuleListResponse {
    pub capsules: Vec<CapsuleView>,
    /// Matches across all pages.
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapsulesResponse {
    pub capsules: Vec<CapsuleView>,
}

// -- Catalog --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total: u64,
    pub unlocked: u64,
    pub locked: u64,
}

// -- Misc --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_remaining_decomposition() {
        let d = Duration::days(3) + Duration::hours(5) + Duration::minutes(42) + Duration::seconds(59);
        assert_eq!(
            TimeRemaining::from_duration(d),
            TimeRemaining { days: 3, hours: 5, minutes: 42 }
        );
        assert_eq!(
            TimeRemaining::from_duration(Duration::seconds(30)),
            TimeRemaining { days: 0, hours: 0, minutes: 0 }
        );
    }

    #[test]
    fn test_tags_accept_list_or_string() {
        let req: CreateCapsuleRequest =
            serde_json::from_value(serde_json::json!({ "tags": ["a", " b "] })).unwrap();
        assert_eq!(TagList::from(req.tags.unwrap()).as_str(), "a,b");

        let req: CreateCapsuleRequest =
            serde_json::from_value(serde_json::json!({ "tags": "a, b" })).unwrap();
        assert_eq!(TagList::from(req.tags.unwrap()).as_str(), "a,b");
    }

    #[test]
    fn test_create_request_ignores_unknown_fields() {
        let req: CreateCapsuleRequest = serde_json::from_value(serde_json::json!({
            "title": "Hello",
            "mood": "nostalgic",
        }))
        .unwrap();
        assert_eq!(req.title.as_deref(), Some("Hello"));
        assert!(req.content.is_none());
    }
}
