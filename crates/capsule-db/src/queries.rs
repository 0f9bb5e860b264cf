use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use tracing::warn;
use uuid::Uuid;

use capsule_types::layout::Fragment;
use capsule_types::models::{Capsule, TagList};
use capsule_types::time::to_storage;

use crate::models::{CAPSULE_COLUMNS, CapsuleRow};
use crate::repository::{CapsuleFilter, CapsuleRepository, UnlockCounts};
use crate::Database;

impl CapsuleRepository for Database {
    fn insert(&self, capsule: &Capsule) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO capsules (id, title, content, content_type, creator_name, creator_email,
                                       tags, created_at, unlock_date, is_public,
                                       fragment_x, fragment_y, fragment_rotation, fragment_scale)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    capsule.id.to_string(),
                    &capsule.title,
                    &capsule.content,
                    &capsule.content_type,
                    &capsule.creator_name,
                    &capsule.creator_email,
                    capsule.tags.as_str(),
                    to_storage(&capsule.created_at),
                    to_storage(&capsule.unlock_date),
                    capsule.is_public,
                    capsule.fragment.x,
                    capsule.fragment.y,
                    capsule.fragment.rotation,
                    capsule.fragment.scale,
                ],
            )?;
            Ok(())
        })
    }

    fn find(&self, id: &Uuid) -> Result<Option<Capsule>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CAPSULE_COLUMNS} FROM capsules WHERE id = ?1");
            let row = conn
                .query_row(&sql, [id.to_string()], CapsuleRow::from_row)
                .optional()?;
            row.map(CapsuleRow::into_capsule).transpose()
        })
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM capsules WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
    }

    fn update_fragment(&self, id: &Uuid, fragment: &Fragment) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE capsules
                 SET fragment_x = ?2, fragment_y = ?3, fragment_rotation = ?4, fragment_scale = ?5
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    fragment.x,
                    fragment.y,
                    fragment.rotation,
                    fragment.scale,
                ],
            )?;
            Ok(updated > 0)
        })
    }

    fn list_public(&self, filter: &CapsuleFilter, limit: u32, offset: u32) -> Result<Vec<Capsule>> {
        let (where_clause, mut params) = filter_clause(filter);
        params.push(Value::Integer(limit.into()));
        params.push(Value::Integer(offset.into()));
        let sql = format!(
            "SELECT {CAPSULE_COLUMNS} FROM capsules WHERE {where_clause}
             ORDER BY created_at DESC
             LIMIT ?{} OFFSET ?{}",
            params.len() - 1,
            params.len(),
        );
        self.with_conn(|conn| query_capsules(conn, &sql, params))
    }

    fn count_public(&self, filter: &CapsuleFilter) -> Result<u64> {
        // Counted over decoded rows so the total agrees with what listings can return.
        let (where_clause, params) = filter_clause(filter);
        let sql = format!("SELECT {CAPSULE_COLUMNS} FROM capsules WHERE {where_clause}");
        let capsules = self.with_conn(|conn| query_capsules(conn, &sql, params))?;
        Ok(capsules.len() as u64)
    }

    fn list_unlocked(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Capsule>> {
        let mut unlocked: Vec<Capsule> = self
            .with_conn(public_capsules)?
            .into_iter()
            .filter(|c| c.unlock_date <= now)
            .collect();
        unlocked.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        unlocked.truncate(limit as usize);
        Ok(unlocked)
    }

    fn list_locked(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Capsule>> {
        let mut locked: Vec<Capsule> = self
            .with_conn(public_capsules)?
            .into_iter()
            .filter(|c| c.unlock_date > now)
            .collect();
        locked.sort_by(|a, b| a.unlock_date.cmp(&b.unlock_date));
        locked.truncate(limit as usize);
        Ok(locked)
    }

    fn public_tags(&self) -> Result<Vec<TagList>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT tags FROM capsules WHERE is_public = 1 AND tags != ''")?;
            let tags = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .map(|r| r.map(TagList::from_stored))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(tags)
        })
    }

    fn unlock_counts(&self, now: DateTime<Utc>) -> Result<UnlockCounts> {
        let mut counts = UnlockCounts::default();
        for capsule in self.with_conn(public_capsules)? {
            counts.total += 1;
            if capsule.unlock_date <= now {
                counts.unlocked += 1;
            } else {
                counts.locked += 1;
            }
        }
        Ok(counts)
    }
}

/// Every readable public capsule. Unlock comparisons happen on parsed instants,
/// not on the stored text, so rows written in older formats still compare correctly.
fn public_capsules(conn: &Connection) -> Result<Vec<Capsule>> {
    let sql = format!("SELECT {CAPSULE_COLUMNS} FROM capsules WHERE is_public = 1");
    query_capsules(conn, &sql, Vec::new())
}

/// Builds the WHERE clause for a public listing, with numbered parameters.
fn filter_clause(filter: &CapsuleFilter) -> (String, Vec<Value>) {
    let mut clauses = vec!["is_public = 1".to_string()];
    let mut params = Vec::new();

    if let Some(tag) = &filter.tag {
        params.push(Value::Text(tag.clone()));
        clauses.push(format!("instr(tags, ?{}) > 0", params.len()));
    }

    if let Some(search) = &filter.search {
        params.push(Value::Text(format!("%{}%", escape_like(search))));
        let n = params.len();
        clauses.push(format!("(title LIKE ?{n} ESCAPE '\\' OR content LIKE ?{n} ESCAPE '\\')"));
    }

    if let Some(content_type) = &filter.content_type {
        params.push(Value::Text(content_type.clone()));
        clauses.push(format!("content_type = ?{}", params.len()));
    }

    (clauses.join(" AND "), params)
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn query_capsules(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Vec<Capsule>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map(params_from_iter(params), CapsuleRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let capsules = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            row.into_capsule()
                .map_err(|e| warn!("Skipping corrupt capsule row '{}': {}", id, e))
                .ok()
        })
        .collect();

    Ok(capsules)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
