//! Backend-agnostic render model for the heatmap grid.
//!
//! Row 0 holds time-bucket headers, column 0 holds category labels and
//! (0, 0) is the aggregate corner. Data cells start at (1, 1).

use super::interval::IntervalSpec;
use super::matrix::HeatmapMatrix;
use super::navigator::{Repaint, SelectionState};
use super::scale::{Rgb, ScaleMode, cell_color};

/// Width in terminal columns of one data cell
pub const CELL_WIDTH: usize = 2;

const MISSING_TEXT: &str = "· ";
const HIGHLIGHT_TEXT: &str = "▐▌";
const EMPTY_CATEGORY_LABEL: &str = "(empty)";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellKind {
    Corner,
    TimeHeader,
    CategoryLabel,
    Value(f64),
    Missing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
    pub bold: bool,
    pub dim: bool,
    pub reversed: bool,
}

impl CellStyle {
    fn highlighted(self) -> Self {
        CellStyle {
            reversed: true,
            bold: true,
            dim: false,
            ..self
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GridCell {
    pub kind: CellKind,
    pub text: String,
    pub style: CellStyle,
    pub highlighted: bool,
}

impl GridCell {
    /// Style to draw with, including the selection highlight
    pub fn effective_style(&self) -> CellStyle {
        if self.highlighted {
            self.style.highlighted()
        } else {
            self.style
        }
    }

    pub fn display_text(&self) -> &str {
        match self.kind {
            CellKind::Value(_) | CellKind::Missing if self.highlighted => HIGHLIGHT_TEXT,
            _ => &self.text,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GridModel {
    rows: usize,
    cols: usize,
    cells: Vec<GridCell>,
}

impl GridModel {
    pub fn build(matrix: &HeatmapMatrix, interval: &IntervalSpec, mode: ScaleMode) -> Self {
        let rows = matrix.category_count() + 1;
        let cols = matrix.bucket_count() + 1;
        let mut cells = Vec::with_capacity(rows * cols);

        cells.push(GridCell {
            kind: CellKind::Corner,
            text: "*".to_string(),
            style: CellStyle {
                bold: true,
                ..CellStyle::default()
            },
            highlighted: false,
        });
        for ts in matrix.timestamps() {
            cells.push(GridCell {
                kind: CellKind::TimeHeader,
                text: ts.format(interval.label_format()).to_string(),
                style: CellStyle {
                    dim: true,
                    ..CellStyle::default()
                },
                highlighted: false,
            });
        }

        for (row, category) in matrix.categories().iter().enumerate() {
            let label = if category.is_empty() {
                EMPTY_CATEGORY_LABEL.to_string()
            } else {
                category.clone()
            };
            cells.push(GridCell {
                kind: CellKind::CategoryLabel,
                text: label,
                style: CellStyle::default(),
                highlighted: false,
            });
            for col in 0..matrix.bucket_count() {
                cells.push(value_cell(matrix, matrix.value_at(row, col), mode));
            }
        }

        GridModel { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    fn cell_mut(&mut self, pos: SelectionState) -> Option<&mut GridCell> {
        if pos.row >= self.rows || pos.col >= self.cols {
            return None;
        }
        self.cells.get_mut(pos.row * self.cols + pos.col)
    }

    /// Un-highlight the previous selection and highlight the new one.
    /// Returns the positions that changed.
    pub fn apply(&mut self, repaint: Repaint) -> Vec<SelectionState> {
        let mut touched = Vec::with_capacity(2);
        if let Some(prev) = repaint.previous
            && prev != repaint.current
            && let Some(cell) = self.cell_mut(prev)
        {
            cell.highlighted = false;
            touched.push(prev);
        }
        if let Some(cell) = self.cell_mut(repaint.current) {
            cell.highlighted = true;
            touched.push(repaint.current);
        }
        touched
    }

    /// Recolor data cells in place for a new scale mode
    pub fn restyle(&mut self, matrix: &HeatmapMatrix, mode: ScaleMode) {
        let cols = self.cols;
        for cell in self.cells.iter_mut().skip(cols) {
            if let CellKind::Value(value) = cell.kind {
                cell.style.bg = Some(cell_color(matrix, value, mode));
            }
        }
    }

    pub fn highlighted(&self) -> Option<SelectionState> {
        self.cells.iter().position(|c| c.highlighted).map(|i| SelectionState {
            row: i / self.cols,
            col: i % self.cols,
        })
    }
}

fn value_cell(matrix: &HeatmapMatrix, value: Option<f64>, mode: ScaleMode) -> GridCell {
    match value {
        Some(v) => GridCell {
            kind: CellKind::Value(v),
            text: " ".repeat(CELL_WIDTH),
            style: CellStyle {
                bg: Some(cell_color(matrix, v, mode)),
                ..CellStyle::default()
            },
            highlighted: false,
        },
        None => GridCell {
            kind: CellKind::Missing,
            text: MISSING_TEXT.to_string(),
            style: CellStyle {
                dim: true,
                ..CellStyle::default()
            },
            highlighted: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::interval::Granularity;
    use crate::heatmap::matrix::DataPoint;
    use chrono::{DateTime, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn sample() -> (HeatmapMatrix, GridModel) {
        let m = HeatmapMatrix::build(vec![
            DataPoint::new(ts(0), "A", 10.0),
            DataPoint::new(ts(0), "B", 20.0),
            DataPoint::new(ts(60), "A", 30.0),
        ])
        .into_matrix()
        .unwrap();
        let grid = GridModel::build(&m, &IntervalSpec::new(Granularity::Minute), ScaleMode::Linear);
        (m, grid)
    }

    fn pos(row: usize, col: usize) -> SelectionState {
        SelectionState { row, col }
    }

    #[test]
    fn test_layout_has_header_row_and_label_column() {
        let (_, grid) = sample();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.cell(0, 0).unwrap().kind, CellKind::Corner);
        assert_eq!(grid.cell(0, 1).unwrap().kind, CellKind::TimeHeader);
        assert_eq!(grid.cell(0, 2).unwrap().text, "00:01");
        assert_eq!(grid.cell(1, 0).unwrap().text, "A");
        assert_eq!(grid.cell(2, 0).unwrap().text, "B");
        assert!(grid.cell(3, 0).is_none());
    }

    #[test]
    fn test_missing_cell_is_distinct_from_value() {
        let (_, grid) = sample();
        assert_eq!(grid.cell(1, 2).unwrap().kind, CellKind::Value(30.0));
        assert_eq!(grid.cell(1, 2).unwrap().style.bg, Some(Rgb::RED));
        let missing = grid.cell(2, 2).unwrap();
        assert_eq!(missing.kind, CellKind::Missing);
        assert_eq!(missing.style.bg, None);
        assert_eq!(missing.display_text(), MISSING_TEXT);
    }

    #[test]
    fn test_apply_touches_only_two_cells() {
        let (_, mut grid) = sample();
        let touched = grid.apply(Repaint {
            previous: None,
            current: pos(1, 1),
        });
        assert_eq!(touched, vec![pos(1, 1)]);

        let before: Vec<GridCell> = (0..grid.rows())
            .flat_map(|r| (0..grid.cols()).map(move |c| (r, c)))
            .map(|(r, c)| grid.cell(r, c).unwrap().clone())
            .collect();

        let touched = grid.apply(Repaint {
            previous: Some(pos(1, 1)),
            current: pos(2, 1),
        });
        assert_eq!(touched, vec![pos(1, 1), pos(2, 1)]);
        assert_eq!(grid.highlighted(), Some(pos(2, 1)));

        let mut changed = 0;
        for r in 0..grid.rows() {
            for c in 0..grid.cols() {
                if grid.cell(r, c).unwrap() != &before[r * grid.cols() + c] {
                    changed += 1;
                }
            }
        }
        assert_eq!(changed, 2);
    }

    #[test]
    fn test_highlight_restores_original_style() {
        let (_, mut grid) = sample();
        let original = grid.cell(1, 1).unwrap().style;
        grid.apply(Repaint {
            previous: None,
            current: pos(1, 1),
        });
        assert!(grid.cell(1, 1).unwrap().effective_style().reversed);
        assert_eq!(grid.cell(1, 1).unwrap().display_text(), HIGHLIGHT_TEXT);
        grid.apply(Repaint {
            previous: Some(pos(1, 1)),
            current: pos(0, 0),
        });
        assert_eq!(grid.cell(1, 1).unwrap().effective_style(), original);
    }

    #[test]
    fn test_restyle_keeps_highlight_and_recolors() {
        let (m, mut grid) = sample();
        grid.apply(Repaint {
            previous: None,
            current: pos(2, 1),
        });
        // B@t0 = 20 is the midpoint: yellow in linear, warmer under log
        assert_eq!(grid.cell(2, 1).unwrap().style.bg, Some(Rgb::YELLOW));
        grid.restyle(&m, ScaleMode::Log10);
        assert_ne!(grid.cell(2, 1).unwrap().style.bg, Some(Rgb::YELLOW));
        assert_eq!(grid.highlighted(), Some(pos(2, 1)));
    }
}
