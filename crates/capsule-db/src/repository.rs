use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use capsule_types::layout::Fragment;
use capsule_types::models::{Capsule, TagList};

/// Persistence seam for capsules.
///
/// Every listing here is restricted to public capsules; only `find`, `delete`
/// and `update_fragment` reach private ones.
pub trait CapsuleRepository: Send + Sync {
    fn insert(&self, capsule: &Capsule) -> Result<()>;

    fn find(&self, id: &Uuid) -> Result<Option<Capsule>>;

    /// Returns `false` when nothing was deleted.
    fn delete(&self, id: &Uuid) -> Result<bool>;

    /// Returns `false` when the capsule does not exist.
    fn update_fragment(&self, id: &Uuid, fragment: &Fragment) -> Result<bool>;

    /// Public capsules matching `filter`, newest first.
    fn list_public(&self, filter: &CapsuleFilter, limit: u32, offset: u32) -> Result<Vec<Capsule>>;

    /// Size of the unpaginated `list_public` result.
    fn count_public(&self, filter: &CapsuleFilter) -> Result<u64>;

    /// Public capsules with `unlock_date <= now`, newest first.
    fn list_unlocked(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Capsule>>;

    /// Public capsules with `unlock_date > now`, soonest to open first.
    fn list_locked(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Capsule>>;

    /// Non-empty tag lists of public capsules.
    fn public_tags(&self) -> Result<Vec<TagList>>;

    fn unlock_counts(&self, now: DateTime<Utc>) -> Result<UnlockCounts>;
}

/// Optional narrowing of the public capsule list. All set fields must match.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CapsuleFilter {
    /// Substring of the comma-joined tags.
    pub tag: Option<String>,
    /// ASCII case-insensitive substring of the title or the content.
    pub search: Option<String>,
    /// Exact content type.
    pub content_type: Option<String>,
}

impl CapsuleFilter {
    /// Visibility is checked by the caller; this only looks at the filter fields.
    pub fn matches(&self, capsule: &Capsule) -> bool {
        if let Some(tag) = &self.tag {
            if !capsule.tags.contains_text(tag) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_ascii_lowercase();
            let in_title = capsule.title.to_ascii_lowercase().contains(&needle);
            let in_content = capsule.content.to_ascii_lowercase().contains(&needle);
            if !in_title && !in_content {
                return false;
            }
        }
        if let Some(content_type) = &self.content_type {
            if &capsule.content_type != content_type {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnlockCounts {
    pub total: u64,
    pub unlocked: u64,
    pub locked: u64,
}
