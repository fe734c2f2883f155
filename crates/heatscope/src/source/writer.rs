use super::schema::{self, SCHEMA_VERSION};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

/// One finished query as stored in `query_log`
#[derive(Debug, Clone, Default)]
pub struct QueryLogRecord {
    pub event_time: i64,
    pub cluster: String,
    pub host: String,
    pub normalized_query_hash: String,
    pub query: String,
    pub tables: String,
    pub exception_code: i64,
    pub query_duration_ms: f64,
    pub memory_usage: i64,
    pub read_rows: i64,
}

impl QueryLogRecord {
    pub fn at(time: DateTime<Utc>) -> Self {
        QueryLogRecord {
            event_time: time.timestamp(),
            ..QueryLogRecord::default()
        }
    }
}

/// Writer for the metrics database
pub struct MetricsWriter {
    conn: Connection,
}

impl MetricsWriter {
    /// Open (or create) a metrics database and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL lets the viewer read while a writer appends
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::create_tables(&conn)?;
        schema::set_meta(&conn, "version", &SCHEMA_VERSION.to_string())?;

        Ok(MetricsWriter { conn })
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        schema::set_meta(&self.conn, key, value)?;
        Ok(())
    }

    /// Insert records in one transaction
    pub fn insert(&mut self, records: &[QueryLogRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO query_log (event_time, cluster, host, normalized_query_hash, query, tables, exception_code, query_duration_ms, memory_usage, read_rows) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;

            for r in records {
                stmt.execute(rusqlite::params![
                    r.event_time,
                    &r.cluster,
                    &r.host,
                    &r.normalized_query_hash,
                    &r.query,
                    &r.tables,
                    r.exception_code,
                    r.query_duration_ms,
                    r.memory_usage,
                    r.read_rows,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Total rows in `query_log`
    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM query_log", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
