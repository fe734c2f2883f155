use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// One aggregated observation returned by the query collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub value: f64,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, category: impl Into<String>, value: f64) -> Self {
        DataPoint {
            timestamp,
            category: category.into(),
            value,
        }
    }
}

/// Result of turning a row set into a matrix.
/// An empty row set is reported, never rendered as an empty grid.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Matrix(HeatmapMatrix),
    Empty,
}

impl BuildOutcome {
    pub fn into_matrix(self) -> Option<HeatmapMatrix> {
        match self {
            BuildOutcome::Matrix(m) => Some(m),
            BuildOutcome::Empty => None,
        }
    }
}

/// Sparse (category x time bucket) matrix with sorted axes
#[derive(Debug, Clone)]
pub struct HeatmapMatrix {
    timestamps: Vec<DateTime<Utc>>,
    categories: Vec<String>,
    /// (category index, timestamp index) -> value; absent means no data
    values: HashMap<(usize, usize), f64>,
    min_value: f64,
    max_value: f64,
}

impl HeatmapMatrix {
    /// Build a matrix from a row stream in a single pass.
    ///
    /// Non-finite values are dropped. If a (category, timestamp) pair repeats,
    /// the later row wins.
    pub fn build<I>(points: I) -> BuildOutcome
    where
        I: IntoIterator<Item = DataPoint>,
    {
        let mut seen_timestamps = BTreeSet::new();
        let mut seen_categories = BTreeSet::new();
        let mut raw: HashMap<(String, DateTime<Utc>), f64> = HashMap::new();

        for point in points {
            if !point.value.is_finite() {
                tracing::warn!(
                    category = %point.category,
                    timestamp = %point.timestamp,
                    "dropping non-finite value"
                );
                continue;
            }
            seen_timestamps.insert(point.timestamp);
            seen_categories.insert(point.category.clone());
            raw.insert((point.category, point.timestamp), point.value);
        }

        if raw.is_empty() {
            return BuildOutcome::Empty;
        }

        let timestamps: Vec<DateTime<Utc>> = seen_timestamps.into_iter().collect();
        let categories: Vec<String> = seen_categories.into_iter().collect();

        let mut min_value = f64::MAX;
        let mut max_value = f64::MIN;
        let mut values = HashMap::with_capacity(raw.len());
        for ((category, timestamp), value) in raw {
            // Both lookups hit: every key contributed to the axis sets above
            let (Ok(row), Ok(col)) = (
                categories.binary_search(&category),
                timestamps.binary_search(&timestamp),
            ) else {
                continue;
            };
            min_value = min_value.min(value);
            max_value = max_value.max(value);
            values.insert((row, col), value);
        }

        if min_value == max_value {
            max_value = min_value + 1.0;
        }

        BuildOutcome::Matrix(HeatmapMatrix {
            timestamps,
            categories,
            values,
            min_value,
            max_value,
        })
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.values.len()
    }

    /// Value by zero-based axis indices
    pub fn value_at(&self, category_idx: usize, timestamp_idx: usize) -> Option<f64> {
        self.values.get(&(category_idx, timestamp_idx)).copied()
    }

    /// Value by axis keys
    pub fn value(&self, category: &str, timestamp: DateTime<Utc>) -> Option<f64> {
        let row = self
            .categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()?;
        let col = self.timestamps.binary_search(&timestamp).ok()?;
        self.value_at(row, col)
    }

    /// Map a raw value into [0, 1] against the global extrema
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.min_value) / (self.max_value - self.min_value)).clamp(0.0, 1.0)
    }
}
