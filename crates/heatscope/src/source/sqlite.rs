use super::schema::{self, SCHEMA_VERSION};
use super::{MetricSource, QueryRequest};
use crate::error::Result;
use crate::heatmap::DataPoint;
use chrono::DateTime;
use rusqlite::{Connection, OpenFlags, ToSql};
use std::path::{Path, PathBuf};

/// Reads aggregated metrics from a SQLite `query_log` table.
///
/// A fresh read-only connection is opened per fetch so the source can be
/// shared with worker threads.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        // Databases filled by other tools may lack the meta table
        if let Ok(Some(version)) = schema::get_meta(&conn, "version")
            && version != SCHEMA_VERSION.to_string()
        {
            tracing::warn!(
                path = %self.path.display(),
                found = %version,
                expected = SCHEMA_VERSION,
                "schema version mismatch"
            );
        }
        Ok(conn)
    }
}

/// Category expression with NULLs folded into the empty label
fn category_sql(expression: &str) -> String {
    format!("COALESCE(CAST({expression} AS TEXT), '')")
}

fn build_sql(request: &QueryRequest) -> String {
    let category = category_sql(&request.category_expression);
    let metric = &request.metric_expression;
    let filters = format!(
        "event_time >= ?2 AND event_time < ?3 \
         AND (?4 IS NULL OR cluster = ?4) \
         AND (?5 IS NULL OR {category} = ?5)"
    );
    let top = if request.category_limit.is_some() {
        format!(
            " AND {category} IN (\
                SELECT {category} FROM query_log WHERE {filters} \
                GROUP BY 1 ORDER BY {metric} DESC LIMIT ?6)"
        )
    } else {
        String::new()
    };

    format!(
        r#"
        SELECT (event_time / ?1) * ?1 AS bucket,
               {category} AS category,
               {metric} AS value
        FROM query_log
        WHERE {filters}{top}
        GROUP BY bucket, category
        ORDER BY bucket ASC, category ASC
        "#
    )
}

fn scan_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<DataPoint>> {
    let bucket: i64 = row.get(0)?;
    let category: String = row.get(1)?;
    let value: Option<f64> = row.get(2)?;
    let (Some(value), Some(timestamp)) = (value, DateTime::from_timestamp(bucket, 0)) else {
        return Ok(None);
    };
    Ok(Some(DataPoint {
        timestamp,
        category,
        value,
    }))
}

impl MetricSource for SqliteSource {
    fn fetch(&self, request: &QueryRequest) -> Result<Vec<DataPoint>> {
        let conn = self.connect()?;
        let sql = build_sql(request);
        let mut stmt = conn.prepare(&sql)?;

        let bucket = request.bucket_seconds.max(1);
        let from = request.from.timestamp();
        let to = request.to.timestamp();
        let limit = request.category_limit.map(|n| n as i64);
        let mut params: Vec<&dyn ToSql> = vec![
            &bucket,
            &from,
            &to,
            &request.cluster,
            &request.category_filter,
        ];
        if let Some(limit) = limit.as_ref() {
            params.push(limit);
        }

        let mut points = Vec::new();
        let mut skipped = 0usize;
        let mut rows = stmt.query(params.as_slice())?;
        while let Some(row) = rows.next()? {
            match scan_row(row) {
                Ok(Some(point)) => points.push(point),
                Ok(None) => skipped += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed row");
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "rows skipped while scanning query result");
        }
        tracing::debug!(
            rows = points.len(),
            bucket_seconds = bucket,
            "fetched metric rows"
        );
        Ok(points)
    }
}
