//! Database row types. These map directly to SQLite rows and are kept apart
//! from the capsule-types model so the storage layout can change on its own.
use anyhow::{Result, anyhow};
use rusqlite::Row;
use uuid::Uuid;

use capsule_types::layout::Fragment;
use capsule_types::models::{Capsule, TagList};
use capsule_types::time::parse_timestamp;

pub const CAPSULE_COLUMNS: &str = "id, title, content, content_type, creator_name, creator_email, \
     tags, created_at, unlock_date, is_public, \
     fragment_x, fragment_y, fragment_rotation, fragment_scale";

pub struct CapsuleRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub creator_name: String,
    pub creator_email: Option<String>,
    pub tags: String,
    pub created_at: String,
    pub unlock_date: String,
    pub is_public: bool,
    pub fragment_x: f64,
    pub fragment_y: f64,
    pub fragment_rotation: f64,
    pub fragment_scale: f64,
}

impl CapsuleRow {
    /// Reads a row selected with [`CAPSULE_COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            content_type: row.get(3)?,
            creator_name: row.get(4)?,
            creator_email: row.get(5)?,
            tags: row.get(6)?,
            created_at: row.get(7)?,
            unlock_date: row.get(8)?,
            is_public: row.get(9)?,
            fragment_x: row.get(10)?,
            fragment_y: row.get(11)?,
            fragment_rotation: row.get(12)?,
            fragment_scale: row.get(13)?,
        })
    }

    pub fn into_capsule(self) -> Result<Capsule> {
        // Zone-less timestamps written by older tooling are taken as UTC.
        let created_at = parse_timestamp(&self.created_at)
            .ok_or_else(|| anyhow!("corrupt created_at '{}' on capsule {}", self.created_at, self.id))?;
        let unlock_date = parse_timestamp(&self.unlock_date)
            .ok_or_else(|| anyhow!("corrupt unlock_date '{}' on capsule {}", self.unlock_date, self.id))?;
        let id: Uuid = self
            .id
            .parse()
            .map_err(|e| anyhow!("corrupt capsule id '{}': {}", self.id, e))?;

        Ok(Capsule {
            id,
            title: self.title,
            content: self.content,
            content_type: self.content_type,
            creator_name: self.creator_name,
            creator_email: self.creator_email,
            tags: TagList::from_stored(self.tags),
            created_at,
            unlock_date,
            is_public: self.is_public,
            fragment: Fragment {
                x: self.fragment_x,
                y: self.fragment_y,
                rotation: self.fragment_rotation,
                scale: self.fragment_scale,
            },
        })
    }
}
