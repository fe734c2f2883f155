use crate::error::{Error, Result};
use crate::source::{MetricsWriter, QueryLogRecord};
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::time::Duration;

const HOSTS: &[&str] = &["ch-node-01", "ch-node-02", "ch-node-03"];
const ERROR_CODES: &[i64] = &[60, 159, 241, 394];
const ERROR_RATE: f64 = 0.03;

/// Query shapes the generator draws from; earlier entries are more frequent
struct Shape {
    hash: &'static str,
    query: &'static str,
    tables: &'static str,
    duration_ms: f64,
    memory: i64,
    rows: i64,
}

const SHAPES: &[Shape] = &[
    Shape {
        hash: "8f1c2a0e5b7d",
        query: "SELECT count() FROM events WHERE date = today()",
        tables: "default.events",
        duration_ms: 12.0,
        memory: 4 << 20,
        rows: 50_000,
    },
    Shape {
        hash: "1b9e44c07a21",
        query: "SELECT user_id, sum(amount) FROM orders GROUP BY user_id",
        tables: "shop.orders",
        duration_ms: 180.0,
        memory: 256 << 20,
        rows: 4_000_000,
    },
    Shape {
        hash: "c4d2f8a913e0",
        query: "INSERT INTO events VALUES",
        tables: "default.events",
        duration_ms: 5.0,
        memory: 1 << 20,
        rows: 0,
    },
    Shape {
        hash: "77a0b3e6d5f2",
        query: "SELECT * FROM sessions s JOIN users u ON s.user_id = u.id",
        tables: "default.sessions,default.users",
        duration_ms: 900.0,
        memory: 1 << 30,
        rows: 12_000_000,
    },
    Shape {
        hash: "e2f19d4c8b36",
        query: "SELECT quantiles(0.5, 0.99)(latency) FROM requests",
        tables: "metrics.requests",
        duration_ms: 450.0,
        memory: 512 << 20,
        rows: 30_000_000,
    },
    Shape {
        hash: "5a6b7c8d9e0f",
        query: "OPTIMIZE TABLE events FINAL",
        tables: "default.events",
        duration_ms: 4_000.0,
        memory: 2 << 30,
        rows: 80_000_000,
    },
];

pub fn run(db: &Path, span: Duration, rate: u32, cluster: &str, seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let to = Utc::now();
    let from = seed_start(to, span)?;

    let mut writer = MetricsWriter::open(db)?;
    writer.set_meta("seeded_at", &to.to_rfc3339())?;

    let mut inserted = 0;
    let mut minute = from;
    let mut batch = Vec::new();
    while minute < to {
        batch.extend(generate_minute(&mut rng, minute, rate, cluster));
        minute += TimeDelta::minutes(1);
        if batch.len() >= 5_000 {
            inserted += writer.insert(&batch)?;
            batch.clear();
        }
    }
    inserted += writer.insert(&batch)?;

    tracing::info!(rows = inserted, db = %db.display(), "seeded query log");
    eprintln!(
        "Inserted {} rows into {} ({} total)",
        inserted,
        db.display(),
        writer.row_count()?
    );
    Ok(())
}

/// Start of a `span` ending at `to`
fn seed_start(to: DateTime<Utc>, span: Duration) -> Result<DateTime<Utc>> {
    TimeDelta::from_std(span)
        .ok()
        .and_then(|span| to.checked_sub_signed(span))
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "--span {} reaches before the earliest supported time",
                humantime::format_duration(span)
            ))
        })
}

/// Rows for one minute starting at `start`
pub fn generate_minute<R: Rng>(
    rng: &mut R,
    start: DateTime<Utc>,
    rate: u32,
    cluster: &str,
) -> Vec<QueryLogRecord> {
    // Busier during working hours, with occasional bursts
    let hour = start.hour() as f64;
    let daily = 1.0 + 0.6 * ((hour - 14.0) / 24.0 * std::f64::consts::TAU).cos();
    let burst = if rng.random_bool(0.02) { 4.0 } else { 1.0 };
    let expected = rate as f64 * daily * burst;
    let count = (expected * rng.random_range(0.5..1.5)).round() as usize;

    (0..count)
        .map(|_| {
            // Squaring skews picks towards the first shapes
            let pick = rng.random::<f64>().powi(2);
            let shape = &SHAPES[((pick * SHAPES.len() as f64) as usize).min(SHAPES.len() - 1)];
            let jitter = rng.random_range(0.3..3.0);
            let failed = rng.random_bool(ERROR_RATE);

            QueryLogRecord {
                cluster: cluster.to_string(),
                host: HOSTS[rng.random_range(0..HOSTS.len())].to_string(),
                normalized_query_hash: shape.hash.to_string(),
                query: shape.query.to_string(),
                tables: shape.tables.to_string(),
                exception_code: if failed {
                    ERROR_CODES[rng.random_range(0..ERROR_CODES.len())]
                } else {
                    0
                },
                query_duration_ms: shape.duration_ms * jitter * burst,
                memory_usage: (shape.memory as f64 * jitter) as i64,
                read_rows: (shape.rows as f64 * jitter) as i64,
                ..QueryLogRecord::at(start + TimeDelta::seconds(rng.random_range(0..60)))
            }
        })
        .collect()
}
