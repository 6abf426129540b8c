use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::error::{AcxError, Result};
use crate::index;

pub const ACCOUNT_CODES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS account_codes (
    id INTEGER PRIMARY KEY,
    account_code TEXT NOT NULL UNIQUE,
    level INTEGER NOT NULL,
    description TEXT NOT NULL,
    uom TEXT NOT NULL DEFAULT '',
    uom2 TEXT NOT NULL DEFAULT '',
    metric_uom TEXT NOT NULL DEFAULT '',
    metric_uom2 TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',
    personal_notes TEXT,
    flags INTEGER NOT NULL DEFAULT 0
);
";

pub const METADATA_TABLE: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Open (creating if needed) the database file.
pub fn get_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// Open an existing, initialized database. A missing file or a file
/// without the catalog schema is reported as `StoreUnavailable`.
pub fn open_existing(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(AcxError::StoreUnavailable(format!(
            "no database at {}\nRun `acx init` to create one.",
            db_path.display()
        )));
    }
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| AcxError::StoreUnavailable(format!("{}: {e}", db_path.display())))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    if !has_table(&conn, "account_codes")? {
        return Err(AcxError::StoreUnavailable(format!(
            "{} is not an account code database",
            db_path.display()
        )));
    }
    // Older files may predate the metadata table or the index.
    conn.execute_batch(METADATA_TABLE)?;
    conn.execute_batch(index::INDEX_SCHEMA)?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(ACCOUNT_CODES_TABLE)?;
    conn.execute_batch(METADATA_TABLE)?;
    conn.execute_batch(index::INDEX_SCHEMA)?;
    Ok(())
}

pub fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1")?;
    Ok(stmt.exists([name])?)
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| r.get(0))
        .optional()?)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

pub fn get_counter(conn: &Connection, key: &str) -> Result<u64> {
    Ok(get_metadata(conn, key)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}
