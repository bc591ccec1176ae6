//! Durable file cache: canonical song URL → Telegram audio `file_id`.
//!
//! This is the persistence layer behind the at-most-one-fetch guarantee.
//! Entries are written once after a successful upload and never updated;
//! there is no eviction.

use super::db::DbConnection;
use rusqlite::{OptionalExtension, Result};

/// Outcome of a `store` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The mapping was written.
    Inserted,
    /// Another writer already owns this key; the existing mapping stands.
    AlreadyExists,
}

/// Point lookup of the cached asset handle for a canonical URL.
pub fn lookup(conn: &DbConnection, canonical_url: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT file_id FROM downloads WHERE url = ?1",
        rusqlite::params![canonical_url],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

/// Inserts a new mapping; a key collision keeps the first writer's handle.
///
/// `INSERT OR IGNORE` makes the call idempotent under concurrent stores:
/// no two distinct handles can ever be retrievable for the same key.
pub fn store(conn: &DbConnection, canonical_url: &str, file_id: &str) -> Result<StoreOutcome> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO downloads (url, file_id) VALUES (?1, ?2)",
        rusqlite::params![canonical_url, file_id],
    )?;

    if inserted == 0 {
        log::debug!("Cache entry already exists for {}", canonical_url);
        Ok(StoreOutcome::AlreadyExists)
    } else {
        Ok(StoreOutcome::Inserted)
    }
}
