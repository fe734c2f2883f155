//! Drill-down actions resolved from the current selection.

use super::interval::IntervalSpec;
use super::matrix::HeatmapMatrix;
use super::metric::{CategoryMode, Metric};
use super::navigator::{SelectionContext, SelectionState};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Flamegraph,
    ProfileEvents,
    Explain,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Flamegraph => "Flamegraph",
            Action::ProfileEvents => "Profile Events",
            Action::Explain => "Explain query",
        }
    }
}

/// Which stack traces a flamegraph should be built from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceType {
    Real,
    Memory,
}

impl TraceType {
    pub fn for_metric(metric: Metric) -> Self {
        match metric {
            Metric::MemoryUsage => TraceType::Memory,
            _ => TraceType::Real,
        }
    }
}

/// Options offered for the given category mode.
/// Explain needs a single normalized query, so only query-hash rows get it.
pub fn menu(category_mode: CategoryMode) -> Vec<Action> {
    let mut actions = vec![Action::Flamegraph, Action::ProfileEvents];
    if category_mode == CategoryMode::QueryHash {
        actions.push(Action::Explain);
    }
    actions
}

/// Category and time range a selection covers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    /// Empty means all categories
    pub category_value: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Request handed to a downstream view
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionRequest {
    pub action: Action,
    pub category_mode: CategoryMode,
    pub category_value: String,
    pub from_time: DateTime<Utc>,
    pub to_time: DateTime<Utc>,
    pub cluster: Option<String>,
    pub trace_type: TraceType,
}

/// Resolve the scope of `selection`, or `None` if it points past the matrix.
///
/// `window` is the current zoom window, used by the category-label and
/// corner contexts.
pub fn resolve_scope(
    selection: SelectionState,
    matrix: &HeatmapMatrix,
    interval: &IntervalSpec,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Option<Scope> {
    let category = |idx: usize| matrix.categories().get(idx).cloned();
    let bucket = |idx: usize| matrix.timestamps().get(idx).copied();

    let scope = match selection.context() {
        SelectionContext::Cell {
            category: c,
            bucket: b,
        } => {
            let start = bucket(b)?;
            Scope {
                category_value: category(c)?,
                from: start,
                to: start + interval.width,
            }
        }
        SelectionContext::Category { category: c } => Scope {
            category_value: category(c)?,
            from: window.0,
            to: window.1,
        },
        SelectionContext::Bucket { bucket: b } => {
            let start = bucket(b)?;
            let center = start + interval.width / 2;
            let half = interval.width * interval.header_window_multiplier() / 2;
            Scope {
                category_value: String::new(),
                from: center - half,
                to: center + half,
            }
        }
        SelectionContext::Corner => Scope {
            category_value: String::new(),
            from: window.0,
            to: window.1,
        },
    };
    Some(scope)
}

pub fn build_request(
    action: Action,
    scope: Scope,
    category_mode: CategoryMode,
    metric: Metric,
    cluster: Option<&str>,
) -> ActionRequest {
    ActionRequest {
        action,
        category_mode,
        category_value: scope.category_value,
        from_time: scope.from,
        to_time: scope.to,
        cluster: cluster.map(str::to_string),
        trace_type: TraceType::for_metric(metric),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::interval::Granularity;
    use crate::heatmap::matrix::DataPoint;
    use chrono::TimeDelta;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    /// 3 categories x 4 one-minute buckets
    fn matrix() -> HeatmapMatrix {
        let mut points = Vec::new();
        for cat in ["a", "b", "c"] {
            for i in 0..4 {
                points.push(DataPoint::new(ts(i * 60), cat, i as f64));
            }
        }
        HeatmapMatrix::build(points).into_matrix().unwrap()
    }

    fn pos(row: usize, col: usize) -> SelectionState {
        SelectionState { row, col }
    }

    const WINDOW: (i64, i64) = (-600, 600);

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (ts(WINDOW.0), ts(WINDOW.1))
    }

    #[test]
    fn test_menu_offers_explain_only_for_query_hash() {
        assert_eq!(
            menu(CategoryMode::QueryHash),
            vec![Action::Flamegraph, Action::ProfileEvents, Action::Explain]
        );
        for mode in [CategoryMode::Table, CategoryMode::Host, CategoryMode::Error] {
            assert!(!menu(mode).contains(&Action::Explain), "{mode:?}");
            assert_eq!(menu(mode).len(), 2);
        }
    }

    #[test]
    fn test_cell_scope_is_one_bucket() {
        let m = matrix();
        let interval = IntervalSpec::new(Granularity::Minute);
        let scope = resolve_scope(pos(2, 3), &m, &interval, window()).unwrap();
        assert_eq!(scope.category_value, m.categories()[1]);
        assert_eq!(scope.from, m.timestamps()[2]);
        assert_eq!(scope.to, m.timestamps()[2] + interval.width);
    }

    #[test]
    fn test_corner_scope_is_whole_window() {
        let m = matrix();
        let interval = IntervalSpec::new(Granularity::Minute);
        let scope = resolve_scope(pos(0, 0), &m, &interval, window()).unwrap();
        assert_eq!(scope.category_value, "");
        assert_eq!((scope.from, scope.to), window());
    }

    #[test]
    fn test_category_scope_spans_window() {
        let m = matrix();
        let interval = IntervalSpec::new(Granularity::Minute);
        let scope = resolve_scope(pos(3, 0), &m, &interval, window()).unwrap();
        assert_eq!(scope.category_value, "c");
        assert_eq!((scope.from, scope.to), window());
    }

    #[test]
    fn test_bucket_scope_centers_on_bucket() {
        let m = matrix();
        let interval = IntervalSpec::new(Granularity::Minute);
        let scope = resolve_scope(pos(0, 2), &m, &interval, window()).unwrap();
        assert_eq!(scope.category_value, "");
        // bucket [60, 120), center 90, 5 buckets wide
        assert_eq!(scope.from, ts(90 - 150));
        assert_eq!(scope.to, ts(90 + 150));
        assert_eq!(scope.to - scope.from, TimeDelta::minutes(5));
    }

    #[test]
    fn test_scope_out_of_range_is_none() {
        let m = matrix();
        let interval = IntervalSpec::new(Granularity::Minute);
        assert!(resolve_scope(pos(4, 1), &m, &interval, window()).is_none());
        assert!(resolve_scope(pos(1, 5), &m, &interval, window()).is_none());
    }

    #[test]
    fn test_trace_type_follows_metric() {
        let scope = Scope {
            category_value: "x".into(),
            from: ts(0),
            to: ts(60),
        };
        let req = build_request(
            Action::Flamegraph,
            scope.clone(),
            CategoryMode::Host,
            Metric::MemoryUsage,
            Some("main"),
        );
        assert_eq!(req.trace_type, TraceType::Memory);
        assert_eq!(req.cluster.as_deref(), Some("main"));

        let req = build_request(Action::Flamegraph, scope, CategoryMode::Host, Metric::Duration, None);
        assert_eq!(req.trace_type, TraceType::Real);
    }

    #[test]
    fn test_request_serializes_rfc3339() {
        let req = build_request(
            Action::Explain,
            Scope {
                category_value: "42".into(),
                from: ts(0),
                to: ts(60),
            },
            CategoryMode::QueryHash,
            Metric::Queries,
            None,
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"], "explain");
        assert_eq!(json["trace_type"], "real");
        assert_eq!(json["category_mode"], "query_hash");
        assert_eq!(json["from_time"], "1970-01-01T00:00:00Z");
    }
}
