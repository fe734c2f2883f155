use rusqlite::{Connection, OptionalExtension};

pub const SCHEMA_VERSION: i32 = 1;

/// Create the metrics tables if they do not exist yet
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Metadata table
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- One row per finished query (event_time in unix seconds)
        CREATE TABLE IF NOT EXISTS query_log (
            event_time INTEGER NOT NULL,
            cluster TEXT NOT NULL DEFAULT '',
            host TEXT NOT NULL DEFAULT '',
            normalized_query_hash TEXT NOT NULL DEFAULT '',
            query TEXT NOT NULL DEFAULT '',
            tables TEXT NOT NULL DEFAULT '',
            exception_code INTEGER NOT NULL DEFAULT 0,
            query_duration_ms REAL NOT NULL DEFAULT 0,
            memory_usage INTEGER NOT NULL DEFAULT 0,
            read_rows INTEGER NOT NULL DEFAULT 0
        );

        -- Index for time-window scans
        CREATE INDEX IF NOT EXISTS idx_query_log_time ON query_log(event_time);
        "#,
    )
}

/// Set a metadata key
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
        [key, value],
    )?;
    Ok(())
}

/// Get a metadata key
pub fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
        row.get(0)
    })
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        set_meta(&conn, "version", "1").unwrap();
        set_meta(&conn, "version", "2").unwrap();
        assert_eq!(get_meta(&conn, "version").unwrap().as_deref(), Some("2"));
        assert_eq!(get_meta(&conn, "missing").unwrap(), None);
    }
}
