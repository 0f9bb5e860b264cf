use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use capsule_types::time::{parse_timestamp, to_storage};

const LATEST: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    run_until(conn, LATEST)
}

pub(crate) fn run_until(conn: &Connection, target: i64) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 && target >= 1 {
        info!("Running migration v1 (capsules)");
        conn.execute_batch(
            "
            CREATE TABLE capsules (
                id                  TEXT PRIMARY KEY,
                title               TEXT NOT NULL,
                content             TEXT NOT NULL,
                content_type        TEXT NOT NULL DEFAULT 'text',
                creator_name        TEXT NOT NULL,
                creator_email       TEXT,
                tags                TEXT NOT NULL DEFAULT '',
                created_at          TEXT NOT NULL,
                unlock_date         TEXT NOT NULL,
                is_public           INTEGER NOT NULL DEFAULT 1,
                fragment_x          REAL NOT NULL DEFAULT 50.0,
                fragment_y          REAL NOT NULL DEFAULT 50.0,
                fragment_rotation   REAL NOT NULL DEFAULT 0.0,
                fragment_scale      REAL NOT NULL DEFAULT 1.0
            );

            CREATE INDEX idx_capsules_public_created
                ON capsules(is_public, created_at);

            CREATE INDEX idx_capsules_public_unlock
                ON capsules(is_public, unlock_date);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 && target >= 2 {
        info!("Running migration v2 (normalize timestamps)");
        let tx = conn.unchecked_transaction()?;
        normalize_timestamps(&tx)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (2)", [])?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}

/// Rewrites `created_at` / `unlock_date` into the fixed-width UTC form so
/// text ordering in SQL matches instant ordering. Unparseable rows are left alone.
fn normalize_timestamps(conn: &Connection) -> Result<()> {
    let rows = {
        let mut stmt = conn.prepare("SELECT id, created_at, unlock_date FROM capsules")?;
        stmt.query_map([], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?
    };

    let mut rewritten = 0;
    for (id, created_at, unlock_date) in rows {
        let (Some(created), Some(unlock)) = (parse_timestamp(&created_at), parse_timestamp(&unlock_date)) else {
            warn!("Leaving capsule '{}' with unreadable timestamps untouched", id);
            continue;
        };
        let (created, unlock) = (to_storage(&created), to_storage(&unlock));
        if created == created_at && unlock == unlock_date {
            continue;
        }
        conn.execute(
            "UPDATE capsules SET created_at = ?2, unlock_date = ?3 WHERE id = ?1",
            rusqlite::params![id, created, unlock],
        )?;
        rewritten += 1;
    }

    if rewritten > 0 {
        info!("Normalized timestamps on {} capsule rows", rewritten);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_raw(conn: &Connection, id: &str, created_at: &str, unlock_date: &str) {
        conn.execute(
            "INSERT INTO capsules (id, title, content, creator_name, created_at, unlock_date)
             VALUES (?1, 'Legacy', 'old', 'Ana', ?2, ?3)",
            rusqlite::params![id, created_at, unlock_date],
        )
        .unwrap();
    }

    fn stored(conn: &Connection, id: &str) -> (String, String) {
        conn.query_row(
            "SELECT created_at, unlock_date FROM capsules WHERE id = ?1",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap()
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, LATEST);
    }

    #[test]
    fn test_v2_normalizes_legacy_timestamps() {
        let conn = Connection::open_in_memory().unwrap();
        run_until(&conn, 1).unwrap();
        insert_raw(&conn, "legacy", "2024-01-01 08:00:00", "2030-06-01 23:00:00");
        insert_raw(&conn, "offset", "2024-01-01T08:00:00+02:00", "2030-06-01");
        insert_raw(&conn, "broken", "yesterday", "tomorrow");

        run(&conn).unwrap();

        assert_eq!(
            stored(&conn, "legacy"),
            ("2024-01-01T08:00:00.000000Z".into(), "2030-06-01T23:00:00.000000Z".into())
        );
        assert_eq!(
            stored(&conn, "offset"),
            ("2024-01-01T06:00:00.000000Z".into(), "2030-06-01T00:00:00.000000Z".into())
        );
        assert_eq!(stored(&conn, "broken"), ("yesterday".into(), "tomorrow".into()));
    }
}
