use super::require_database;
use crate::error::Result;
use comfy_table::{Table, presets};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Run `sql` read-only and print the result set as a table
pub fn run(db: &Path, sql: &str) -> Result<()> {
    require_database(db)?;
    let conn = Connection::open_with_flags(db, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let (table, rows) = execute(&conn, sql)?;
    println!("{table}");
    eprintln!("{rows} row(s)");
    Ok(())
}

fn execute(conn: &Connection, sql: &str) -> Result<(Table, usize)> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(stmt.column_names());

    let mut count = 0;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let values: Vec<String> = (0..column_count)
            .map(|i| {
                row.get::<_, Value>(i)
                    .map(|v| format_value(&v))
                    .unwrap_or_else(|_| "NULL".to_string())
            })
            .collect();
        table.add_row(values);
        count += 1;
    }

    Ok((table, count))
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => format!("{:.6}", f),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}
