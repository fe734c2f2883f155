use super::require_database;
use crate::cli::ViewArgs;
use crate::error::Result;
use crate::heatmap::session::NO_DATA_MESSAGE;
use crate::heatmap::{BuildOutcome, Fetcher, HeatmapMatrix, HeatmapSession, IntervalSpec, ViewSettings};
use crate::source::{MetricSource, SqliteSource};
use chrono::{DateTime, SecondsFormat, Utc};
use comfy_table::{Cell, CellAlignment, Table, presets};
use std::path::Path;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Table,
    Csv,
    Json,
}

pub fn run(db: &Path, args: &ViewArgs, json: bool, csv: bool) -> Result<()> {
    require_database(db)?;

    let format = if json {
        Format::Json
    } else if csv {
        Format::Csv
    } else {
        Format::Table
    };

    let (from, to) = args.window(Utc::now())?;
    let settings = args.settings();
    let (interval, outcome) = fetch_once(SqliteSource::new(db), &settings, from, to)?;

    let Some(matrix) = outcome.into_matrix() else {
        eprintln!("{NO_DATA_MESSAGE}");
        return Ok(());
    };

    let output = match format {
        Format::Table => render_table(&matrix, &interval),
        Format::Csv => render_csv(&matrix),
        Format::Json => render_json(&matrix, &interval, &settings, (from, to))?,
    };
    println!("{output}");
    Ok(())
}

/// Run a single fetch cycle synchronously
pub fn fetch_once<S: MetricSource + 'static>(
    source: S,
    settings: &ViewSettings,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<(IntervalSpec, BuildOutcome)> {
    let mut session = HeatmapSession::new(settings.clone(), from, to)?;
    let mut fetcher = Fetcher::new(source);
    fetcher.start(session.begin_fetch());
    let response = fetcher.wait(FETCH_TIMEOUT)?;
    Ok((session.interval(), response.outcome?))
}

/// Categories as rows, buckets as columns
pub fn render_table(matrix: &HeatmapMatrix, interval: &IntervalSpec) -> String {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);

    let mut header = vec![Cell::new("category")];
    header.extend(
        matrix
            .timestamps()
            .iter()
            .map(|ts| Cell::new(ts.format(interval.label_format()))),
    );
    table.set_header(header);

    for (row, category) in matrix.categories().iter().enumerate() {
        let mut cells = vec![Cell::new(category)];
        cells.extend((0..matrix.bucket_count()).map(|col| {
            let text = matrix
                .value_at(row, col)
                .map(format_number)
                .unwrap_or_else(|| "·".to_string());
            Cell::new(text).set_alignment(CellAlignment::Right)
        }));
        table.add_row(cells);
    }

    table.to_string()
}

/// One line per present cell: `timestamp,category,value`
pub fn render_csv(matrix: &HeatmapMatrix) -> String {
    let mut out = String::from("timestamp,category,value\n");
    for (col, ts) in matrix.timestamps().iter().enumerate() {
        for (row, category) in matrix.categories().iter().enumerate() {
            if let Some(value) = matrix.value_at(row, col) {
                out.push_str(&format!(
                    "{},{},{}\n",
                    ts.to_rfc3339_opts(SecondsFormat::Secs, true),
                    csv_field(category),
                    value
                ));
            }
        }
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn render_json(
    matrix: &HeatmapMatrix,
    interval: &IntervalSpec,
    settings: &ViewSettings,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<String> {
    let mut cells = Vec::with_capacity(matrix.cell_count());
    for (col, ts) in matrix.timestamps().iter().enumerate() {
        for (row, category) in matrix.categories().iter().enumerate() {
            if let Some(value) = matrix.value_at(row, col) {
                cells.push(serde_json::json!({
                    "timestamp": ts,
                    "category": category,
                    "value": value,
                }));
            }
        }
    }

    let doc = serde_json::json!({
        "from": window.0,
        "to": window.1,
        "bucket_seconds": interval.bucket_seconds,
        "metric": settings.metric,
        "category_mode": settings.category_mode,
        "min_value": matrix.min_value(),
        "max_value": matrix.max_value(),
        "timestamps": matrix.timestamps(),
        "categories": matrix.categories(),
        "cells": cells,
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::{DataPoint, Metric};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn matrix() -> HeatmapMatrix {
        HeatmapMatrix::build(vec![
            DataPoint::new(ts(0), "a,b", 1.0),
            DataPoint::new(ts(60), "c", 2.5),
        ])
        .into_matrix()
        .unwrap()
    }

    #[test]
    fn test_csv_quotes_fields() {
        let csv = render_csv(&matrix());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "timestamp,category,value",
                "1970-01-01T00:00:00Z,\"a,b\",1",
                "1970-01-01T00:01:00Z,c,2.5",
            ]
        );
    }

    #[test]
    fn test_table_marks_missing_cells() {
        let interval = IntervalSpec::for_duration(chrono::TimeDelta::hours(1));
        let table = render_table(&matrix(), &interval);
        assert!(table.contains("00:01"));
        assert!(table.contains("2.50"));
        assert!(table.contains('·'));
    }

    #[test]
    fn test_json_document() {
        let interval = IntervalSpec::for_duration(chrono::TimeDelta::hours(1));
        let settings = ViewSettings {
            metric: Metric::ReadRows,
            ..ViewSettings::default()
        };
        let json = render_json(&matrix(), &interval, &settings, (ts(0), ts(3600))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["bucket_seconds"], 60);
        assert_eq!(value["metric"], "read_rows");
        assert_eq!(value["cells"].as_array().unwrap().len(), 2);
        assert_eq!(value["categories"][0], "a,b");
        assert_eq!(value["max_value"], 2.5);
    }
}
