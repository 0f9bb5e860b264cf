use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::layout::Fragment;

pub const DEFAULT_CONTENT_TYPE: &str = "text";

/// A message sealed until `unlock_date`.
///
/// Only the fragment layout is ever mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// Free-form; the front-end knows `text`, `drawing` and `code`.
    pub content_type: String,
    pub creator_name: String,
    pub creator_email: Option<String>,
    pub tags: TagList,
    pub created_at: DateTime<Utc>,
    pub unlock_date: DateTime<Utc>,
    pub is_public: bool,
    pub fragment: Fragment,
}

/// Tags in their stored, comma-joined form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList(String);

impl TagList {
    /// Trims each tag and drops empty ones before joining.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        Self(joined)
    }

    pub fn from_joined(joined: &str) -> Self {
        Self::from_tags(joined.split(','))
    }

    /// Wraps a value read back from storage as-is.
    pub fn from_stored(stored: String) -> Self {
        Self(stored)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.split(',').map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    /// Substring match against the joined form, so `"art"` also matches `"party"`.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_trimmed_and_joined() {
        let tags = TagList::from_tags(["  memories ", "", "2030", " "]);
        assert_eq!(tags.as_str(), "memories,2030");
        assert_eq!(tags.to_vec(), vec!["memories", "2030"]);
    }

    #[test]
    fn test_joined_input_is_normalized() {
        let tags = TagList::from_joined("a, b ,,c");
        assert_eq!(tags.as_str(), "a,b,c");
    }

    #[test]
    fn test_empty_tags() {
        let tags = TagList::from_tags(Vec::<String>::new());
        assert!(tags.is_empty());
        assert_eq!(tags.iter().count(), 0);
    }

    #[test]
    fn test_tag_match_is_substring_of_joined_form() {
        let tags = TagList::from_joined("party,family");
        assert!(tags.contains_text("art"));
        assert!(tags.contains_text("y,f"));
        assert!(!tags.contains_text("Party"));
    }
}
