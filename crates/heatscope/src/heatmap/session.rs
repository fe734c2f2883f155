//! Interactive state machine for one heatmap view.
//!
//! The session never talks to the terminal or the database. It turns inputs
//! into effects (redraw, refetch, dispatch) and installs fetch outcomes
//! handed to it by the UI thread.

use super::action::{self, Action, ActionRequest, Scope};
use super::grid::GridModel;
use super::interval::IntervalSpec;
use super::matrix::{BuildOutcome, HeatmapMatrix};
use super::metric::{CategoryMode, Metric};
use super::navigator::{GridNavigator, SelectionContext};
use super::scale::{LegendEntry, ScaleMode, legend};
use super::zoom::ZoomState;
use crate::error::Result;
use crate::source::QueryRequest;
use chrono::{DateTime, Utc};

pub const NO_DATA_MESSAGE: &str = "No data for selected range/category";

/// User-selected view parameters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewSettings {
    pub metric: Metric,
    pub category_mode: CategoryMode,
    pub scale: ScaleMode,
    pub cluster: Option<String>,
    pub category_filter: Option<String>,
    pub category_limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Loading,
    Ready,
    NoData,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    Confirm,
    Cancel,
    CycleScale,
    CycleMetric,
    CycleCategory,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    None,
    Redraw,
    /// Start a new fetch cycle with `HeatmapSession::begin_fetch`
    Refetch,
    Dispatch(ActionRequest),
}

/// Open drill-down menu
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionMenu {
    pub items: Vec<Action>,
    pub selected: usize,
    pub scope: Scope,
}

/// A matrix on screen together with the window it was fetched for
#[derive(Clone, Debug)]
pub struct Loaded {
    pub matrix: HeatmapMatrix,
    pub interval: IntervalSpec,
    pub window: (DateTime<Utc>, DateTime<Utc>),
    pub grid: GridModel,
    pub navigator: GridNavigator,
}

pub struct HeatmapSession {
    settings: ViewSettings,
    zoom: ZoomState,
    /// Interval of the window being fetched
    pending_interval: IntervalSpec,
    pending_window: (DateTime<Utc>, DateTime<Utc>),
    loaded: Option<Loaded>,
    status: Status,
    menu: Option<ActionMenu>,
    notice: Option<String>,
    viewport: (usize, usize),
}

impl HeatmapSession {
    pub fn new(settings: ViewSettings, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        let zoom = ZoomState::new(from, to)?;
        Ok(HeatmapSession {
            settings,
            zoom,
            pending_interval: IntervalSpec::for_duration(zoom.duration()),
            pending_window: zoom.current(),
            loaded: None,
            status: Status::Loading,
            menu: None,
            notice: None,
            viewport: (1, 1),
        })
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn loaded(&self) -> Option<&Loaded> {
        self.loaded.as_ref()
    }

    pub fn menu(&self) -> Option<&ActionMenu> {
        self.menu.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Interval for the window currently shown or being fetched
    pub fn interval(&self) -> IntervalSpec {
        self.pending_interval
    }

    /// Record a one-line message for the status bar
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn legend(&self, samples: usize) -> Vec<LegendEntry> {
        self.loaded
            .as_ref()
            .map(|l| legend(&l.matrix, self.settings.scale, samples))
            .unwrap_or_default()
    }

    /// Size of the visible data area, in data rows and data columns
    pub fn set_viewport(&mut self, rows: usize, cols: usize) {
        self.viewport = (rows.max(1), cols.max(1));
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.navigator.ensure_visible(self.viewport.0, self.viewport.1);
        }
    }

    /// Query for the current window; marks the session as loading
    pub fn begin_fetch(&mut self) -> QueryRequest {
        let (from, to) = self.zoom.current();
        self.pending_interval = IntervalSpec::for_duration(self.zoom.duration());
        self.pending_window = (from, to);
        self.status = Status::Loading;
        QueryRequest {
            metric_expression: self.settings.metric.expression().to_string(),
            category_expression: self.settings.category_mode.expression().to_string(),
            cluster: self.settings.cluster.clone(),
            from,
            to,
            bucket_seconds: self.pending_interval.bucket_seconds,
            category_filter: self.settings.category_filter.clone(),
            category_limit: self.settings.category_limit,
        }
    }

    /// Install the outcome of the latest fetch cycle.
    ///
    /// A failure keeps whatever matrix was on screen.
    pub fn apply(&mut self, outcome: Result<BuildOutcome>) {
        match outcome {
            Ok(BuildOutcome::Matrix(matrix)) => {
                let interval = self.pending_interval;
                let mut grid = GridModel::build(&matrix, &interval, self.settings.scale);
                let mut navigator = match self.loaded.take() {
                    Some(prev) => prev.navigator,
                    None => GridNavigator::new(matrix.category_count(), matrix.bucket_count()),
                };
                grid.apply(navigator.resize(matrix.category_count(), matrix.bucket_count()));
                navigator.ensure_visible(self.viewport.0, self.viewport.1);
                tracing::info!(
                    categories = matrix.category_count(),
                    buckets = matrix.bucket_count(),
                    cells = matrix.cell_count(),
                    "heatmap ready"
                );
                self.loaded = Some(Loaded {
                    matrix,
                    interval,
                    window: self.pending_window,
                    grid,
                    navigator,
                });
                self.status = Status::Ready;
            }
            Ok(BuildOutcome::Empty) => {
                tracing::info!("fetch returned no rows");
                self.loaded = None;
                self.menu = None;
                self.status = Status::NoData;
            }
            Err(e) => {
                tracing::error!(error = %e, "fetch failed");
                self.status = Status::Failed(e.to_string());
            }
        }
    }

    pub fn handle(&mut self, input: Input) -> Effect {
        if self.menu.is_some() {
            return self.handle_menu(input);
        }

        match input {
            Input::Up | Input::Down | Input::Left | Input::Right => {
                let (d_row, d_col) = match input {
                    Input::Up => (-1, 0),
                    Input::Down => (1, 0),
                    Input::Left => (0, -1),
                    _ => (0, 1),
                };
                self.navigate(|nav| nav.move_by(d_row, d_col))
            }
            Input::PageUp => {
                let page = self.viewport.0 as isize;
                self.navigate(|nav| nav.move_by(-page, 0))
            }
            Input::PageDown => {
                let page = self.viewport.0 as isize;
                self.navigate(|nav| nav.move_by(page, 0))
            }
            Input::Home => self.navigate(GridNavigator::home),
            Input::End => self.navigate(GridNavigator::end),
            Input::ZoomIn => self.zoom_in(),
            Input::ZoomOut => {
                self.zoom = self.zoom.zoomed_out();
                Effect::Refetch
            }
            Input::ZoomReset => {
                self.zoom = self.zoom.reset();
                Effect::Refetch
            }
            Input::Confirm => self.open_menu(),
            Input::Cancel => {
                if self.notice.take().is_some() {
                    Effect::Redraw
                } else {
                    Effect::None
                }
            }
            Input::CycleScale => {
                self.settings.scale = self.settings.scale.next();
                if let Some(loaded) = self.loaded.as_mut() {
                    loaded.grid.restyle(&loaded.matrix, self.settings.scale);
                }
                Effect::Redraw
            }
            Input::CycleMetric => {
                self.settings.metric = self.settings.metric.next();
                Effect::Refetch
            }
            Input::CycleCategory => {
                self.settings.category_mode = self.settings.category_mode.next();
                Effect::Refetch
            }
            Input::Refresh => Effect::Refetch,
        }
    }

    fn navigate<F>(&mut self, step: F) -> Effect
    where
        F: FnOnce(&mut GridNavigator) -> Option<super::navigator::Repaint>,
    {
        let (rows, cols) = self.viewport;
        let Some(loaded) = self.loaded.as_mut() else {
            return Effect::None;
        };
        match step(&mut loaded.navigator) {
            Some(repaint) => {
                loaded.grid.apply(repaint);
                loaded.navigator.ensure_visible(rows, cols);
                Effect::Redraw
            }
            None => Effect::None,
        }
    }

    fn zoom_in(&mut self) -> Effect {
        let Some(loaded) = self.loaded.as_ref() else {
            return Effect::None;
        };
        let SelectionContext::Cell { bucket, .. } = loaded.navigator.context() else {
            self.notice = Some("Select a cell to zoom in".to_string());
            return Effect::Redraw;
        };
        let Some(start) = loaded.matrix.timestamps().get(bucket).copied() else {
            return Effect::None;
        };
        let width = loaded.interval.width;
        let (initial_from, initial_to) = self.zoom.initial();
        if start >= initial_to || start + width <= initial_from {
            self.notice = Some("Bucket is outside the session window".to_string());
            return Effect::Redraw;
        }
        let zoomed = self.zoom.zoomed_in(start, width);
        if zoomed == self.zoom {
            self.notice = Some("Already zoomed in on this bucket".to_string());
            return Effect::Redraw;
        }
        self.zoom = zoomed;
        Effect::Refetch
    }

    fn open_menu(&mut self) -> Effect {
        let Some(loaded) = self.loaded.as_ref() else {
            return Effect::None;
        };
        let Some(scope) = action::resolve_scope(
            loaded.navigator.selection(),
            &loaded.matrix,
            &loaded.interval,
            loaded.window,
        ) else {
            return Effect::None;
        };
        self.menu = Some(ActionMenu {
            items: action::menu(self.settings.category_mode),
            selected: 0,
            scope,
        });
        Effect::Redraw
    }

    fn handle_menu(&mut self, input: Input) -> Effect {
        let Some(menu) = self.menu.as_mut() else {
            return Effect::None;
        };
        match input {
            Input::Up => {
                menu.selected = menu.selected.saturating_sub(1);
                Effect::Redraw
            }
            Input::Down => {
                menu.selected = (menu.selected + 1).min(menu.items.len().saturating_sub(1));
                Effect::Redraw
            }
            Input::Cancel => {
                self.menu = None;
                Effect::Redraw
            }
            Input::Confirm => {
                let Some(menu) = self.menu.take() else {
                    return Effect::None;
                };
                let Some(chosen) = menu.items.get(menu.selected).copied() else {
                    return Effect::Redraw;
                };
                let request = action::build_request(
                    chosen,
                    menu.scope,
                    self.settings.category_mode,
                    self.settings.metric,
                    self.settings.cluster.as_deref(),
                );
                Effect::Dispatch(request)
            }
            _ => Effect::None,
        }
    }
}
