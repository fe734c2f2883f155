//! Heatmap engine: bucketed time x category matrices, coloring, navigation,
//! zoom and drill-down actions. Nothing in here touches the terminal.

pub mod action;
pub mod fetch;
pub mod grid;
pub mod interval;
pub mod matrix;
pub mod metric;
pub mod navigator;
pub mod scale;
pub mod session;
pub mod zoom;

pub use action::{Action, ActionRequest, Scope, TraceType};
pub use fetch::{FetchResponse, Fetcher};
pub use grid::{CellKind, CellStyle, GridCell, GridModel};
pub use interval::{Granularity, IntervalSpec};
pub use matrix::{BuildOutcome, DataPoint, HeatmapMatrix};
pub use metric::{CategoryMode, Metric};
pub use navigator::{GridNavigator, Repaint, ScrollPositions, SelectionContext, SelectionState};
pub use scale::{LegendEntry, Rgb, ScaleMode};
pub use session::{Effect, HeatmapSession, Input, Status, ViewSettings};
pub use zoom::ZoomState;
