//! Cursor, selection context and scroll bookkeeping over the grid.

/// Cursor position in grid coordinates.
///
/// `row` is in `[0, categories]`, `col` is in `[0, buckets]`; row 0 and
/// column 0 are the header/aggregate positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SelectionState {
    pub row: usize,
    pub col: usize,
}

/// What the current selection means for drill-down actions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionContext {
    /// One category at one time bucket
    Cell { category: usize, bucket: usize },
    /// One category over the whole window
    Category { category: usize },
    /// All categories around one time bucket
    Bucket { bucket: usize },
    /// All categories over the whole window
    Corner,
}

impl SelectionState {
    pub fn context(self) -> SelectionContext {
        match (self.row, self.col) {
            (0, 0) => SelectionContext::Corner,
            (0, col) => SelectionContext::Bucket { bucket: col - 1 },
            (row, 0) => SelectionContext::Category { category: row - 1 },
            (row, col) => SelectionContext::Cell {
                category: row - 1,
                bucket: col - 1,
            },
        }
    }
}

/// Cells whose styling must change after a cursor move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repaint {
    pub previous: Option<SelectionState>,
    pub current: SelectionState,
}

/// Scroll-bar state along one axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollAxis {
    /// Total positions along the axis, header included
    pub length: usize,
    pub position: usize,
}

impl ScrollAxis {
    /// Thumb position as a fraction of the track
    pub fn fraction(&self) -> f64 {
        if self.length <= 1 {
            0.0
        } else {
            self.position as f64 / (self.length - 1) as f64
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollPositions {
    pub vertical: ScrollAxis,
    pub horizontal: ScrollAxis,
}

/// Owns the cursor and the visible window over data rows and columns
#[derive(Clone, Debug)]
pub struct GridNavigator {
    selection: SelectionState,
    categories: usize,
    buckets: usize,
    /// First visible data row (0-based over categories)
    row_offset: usize,
    /// First visible data column (0-based over buckets)
    col_offset: usize,
    scroll: ScrollPositions,
}

impl GridNavigator {
    pub fn new(categories: usize, buckets: usize) -> Self {
        let selection = SelectionState {
            row: categories.min(1),
            col: buckets.min(1),
        };
        let mut nav = GridNavigator {
            selection,
            categories,
            buckets,
            row_offset: 0,
            col_offset: 0,
            scroll: ScrollPositions::default(),
        };
        nav.update_scroll();
        nav
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn context(&self) -> SelectionContext {
        self.selection.context()
    }

    pub fn scroll(&self) -> ScrollPositions {
        self.scroll
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn col_offset(&self) -> usize {
        self.col_offset
    }

    /// Adopt new matrix dimensions, keeping the cursor where it still fits
    pub fn resize(&mut self, categories: usize, buckets: usize) -> Repaint {
        self.categories = categories;
        self.buckets = buckets;
        self.selection = SelectionState {
            row: self.selection.row.min(categories),
            col: self.selection.col.min(buckets),
        };
        self.row_offset = self.row_offset.min(categories.saturating_sub(1));
        self.col_offset = self.col_offset.min(buckets.saturating_sub(1));
        self.update_scroll();
        Repaint {
            previous: None,
            current: self.selection,
        }
    }

    /// Move by a row/column delta, clamped to the grid.
    /// Returns `None` if the cursor did not move.
    pub fn move_by(&mut self, d_row: isize, d_col: isize) -> Option<Repaint> {
        let target = SelectionState {
            row: clamp_step(self.selection.row, d_row, self.categories),
            col: clamp_step(self.selection.col, d_col, self.buckets),
        };
        self.move_to(target)
    }

    pub fn move_to(&mut self, target: SelectionState) -> Option<Repaint> {
        let target = SelectionState {
            row: target.row.min(self.categories),
            col: target.col.min(self.buckets),
        };
        if target == self.selection {
            return None;
        }
        let previous = self.selection;
        self.selection = target;
        self.update_scroll();
        Some(Repaint {
            previous: Some(previous),
            current: target,
        })
    }

    pub fn up(&mut self) -> Option<Repaint> {
        self.move_by(-1, 0)
    }

    pub fn down(&mut self) -> Option<Repaint> {
        self.move_by(1, 0)
    }

    pub fn left(&mut self) -> Option<Repaint> {
        self.move_by(0, -1)
    }

    pub fn right(&mut self) -> Option<Repaint> {
        self.move_by(0, 1)
    }

    /// Jump to the first time bucket of the current row
    pub fn home(&mut self) -> Option<Repaint> {
        let target = SelectionState {
            col: self.buckets.min(1),
            ..self.selection
        };
        self.move_to(target)
    }

    /// Jump to the last time bucket of the current row
    pub fn end(&mut self) -> Option<Repaint> {
        let target = SelectionState {
            col: self.buckets,
            ..self.selection
        };
        self.move_to(target)
    }

    /// Scroll offsets so the cursor stays inside a viewport of
    /// `view_rows` data rows by `view_cols` data columns
    pub fn ensure_visible(&mut self, view_rows: usize, view_cols: usize) {
        if self.selection.row > 0 {
            self.row_offset = follow(self.row_offset, self.selection.row - 1, view_rows);
        }
        if self.selection.col > 0 {
            self.col_offset = follow(self.col_offset, self.selection.col - 1, view_cols);
        }
        let max_row_offset = self.categories.saturating_sub(view_rows.max(1));
        let max_col_offset = self.buckets.saturating_sub(view_cols.max(1));
        self.row_offset = self.row_offset.min(max_row_offset);
        self.col_offset = self.col_offset.min(max_col_offset);
    }

    fn update_scroll(&mut self) {
        self.scroll = ScrollPositions {
            vertical: ScrollAxis {
                length: self.categories + 1,
                position: self.selection.row,
            },
            horizontal: ScrollAxis {
                length: self.buckets + 1,
                position: self.selection.col,
            },
        };
    }
}

fn clamp_step(current: usize, delta: isize, max: usize) -> usize {
    current.saturating_add_signed(delta).min(max)
}

/// Smallest change to `offset` that keeps `index` inside `[offset, offset + span)`
fn follow(offset: usize, index: usize, span: usize) -> usize {
    let span = span.max(1);
    if index < offset {
        index
    } else if index >= offset + span {
        index + 1 - span
    } else {
        offset
    }
}
