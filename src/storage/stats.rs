//! Best-effort usage statistics.
//!
//! Every write is fire-and-forget: a failed insert is logged and the
//! calling path carries on.

use super::db::{get_connection, DbPool};

/// Records one discrete user action (share, download request, cache hit).
pub fn record_action(pool: &DbPool, user_id: i64, action: &str, url: Option<&str>) {
    let conn = match get_connection(pool) {
        Ok(conn) => conn,
        Err(e) => {
            log::warn!("Failed to get DB connection for action log: {}", e);
            return;
        }
    };

    if let Err(e) = conn.execute(
        "INSERT INTO action_log (user_id, action, url) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, action, url],
    ) {
        log::warn!("Failed to record action '{}' for user {}: {}", action, user_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::create_memory_pool;

    #[test]
    fn records_actions_with_and_without_url() {
        let pool = create_memory_pool().expect("pool");

        record_action(&pool, 42, "share", Some("https://song.link/s/abc"));
        record_action(&pool, 42, "start", None);

        let conn = get_connection(&pool).expect("conn");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM action_log WHERE user_id = 42", [], |row| {
                row.get(0)
            })
            .expect("count");
        assert_eq!(count, 2);
    }
}
