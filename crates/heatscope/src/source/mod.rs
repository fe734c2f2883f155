//! Query collaborator: turns a metric/category request into aggregated rows.

mod schema;
pub mod sqlite;
pub mod writer;

use crate::error::Result;
use crate::heatmap::DataPoint;
use chrono::{DateTime, Utc};

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteSource;
pub use writer::{MetricsWriter, QueryLogRecord};

/// Parameters of one aggregation query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Aggregate SQL expression producing the cell value
    pub metric_expression: String,
    /// SQL expression producing the category label
    pub category_expression: String,
    pub cluster: Option<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Bucket width in seconds
    pub bucket_seconds: i64,
    /// Restrict to a single category value
    pub category_filter: Option<String>,
    /// Keep only the top N categories by aggregated value
    pub category_limit: Option<usize>,
}

/// Source of aggregated (timestamp, category, value) rows.
///
/// Implementations are called from a background thread.
pub trait MetricSource: Send + Sync {
    fn fetch(&self, request: &QueryRequest) -> Result<Vec<DataPoint>>;
}

impl<S: MetricSource + ?Sized> MetricSource for std::sync::Arc<S> {
    fn fetch(&self, request: &QueryRequest) -> Result<Vec<DataPoint>> {
        (**self).fetch(request)
    }
}
