use serde::Serialize;

/// Aggregated value plotted in each cell
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Number of queries
    #[default]
    Queries,
    /// Total query duration in milliseconds
    Duration,
    /// Peak memory usage in bytes
    #[value(name = "memory")]
    MemoryUsage,
    /// Rows read
    ReadRows,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Queries,
        Metric::Duration,
        Metric::MemoryUsage,
        Metric::ReadRows,
    ];

    /// Aggregate SQL expression over `query_log`
    pub fn expression(self) -> &'static str {
        match self {
            Metric::Queries => "COUNT(*)",
            Metric::Duration => "SUM(query_duration_ms)",
            Metric::MemoryUsage => "MAX(memory_usage)",
            Metric::ReadRows => "SUM(read_rows)",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Queries => "queries",
            Metric::Duration => "duration ms",
            Metric::MemoryUsage => "memory",
            Metric::ReadRows => "read rows",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Dimension the rows of the heatmap are grouped by
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMode {
    /// Normalized query hash
    #[default]
    QueryHash,
    /// Tables touched by the query
    Table,
    /// Host that ran the query
    Host,
    /// Exception code
    Error,
}

impl CategoryMode {
    pub const ALL: [CategoryMode; 4] = [
        CategoryMode::QueryHash,
        CategoryMode::Table,
        CategoryMode::Host,
        CategoryMode::Error,
    ];

    /// Grouping SQL expression over `query_log`
    pub fn expression(self) -> &'static str {
        match self {
            CategoryMode::QueryHash => "normalized_query_hash",
            CategoryMode::Table => "tables",
            CategoryMode::Host => "host",
            CategoryMode::Error => "CAST(exception_code AS TEXT)",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryMode::QueryHash => "query hash",
            CategoryMode::Table => "table",
            CategoryMode::Host => "host",
            CategoryMode::Error => "error",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}
