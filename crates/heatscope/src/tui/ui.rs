use super::app::App;
use crate::heatmap::grid::CELL_WIDTH;
use crate::heatmap::session::{ActionMenu, NO_DATA_MESSAGE};
use crate::heatmap::{CellStyle, GridModel, HeatmapSession, Rgb, SelectionState, Status};
use crate::source::MetricSource;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
    },
};

const LEGEND_SAMPLES: usize = 5;
const MAX_LABEL_WIDTH: usize = 32;
const MIN_LABEL_WIDTH: usize = 4;

pub fn render<S: MetricSource + 'static>(frame: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(5),    // Heatmap
            Constraint::Length(1), // Legend / status
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    let fetch_secs = app.fetch_elapsed().map(|d| d.as_secs_f64());
    render_header(frame, &app.session, fetch_secs, chunks[0]);
    render_main(frame, &mut app.session, chunks[1]);
    render_legend(frame, &app.session, chunks[2]);
    render_footer(frame, &app.session, chunks[3]);

    if let Some(menu) = app.session.menu() {
        render_menu(frame, menu, chunks[1]);
    }
}

/// Shown in place of the grid when nothing is loaded
fn placeholder_text(status: &Status) -> &str {
    match status {
        Status::NoData => NO_DATA_MESSAGE,
        // Error text as reported by the fetch
        Status::Failed(msg) => msg,
        _ => "Loading...",
    }
}

fn render_header(frame: &mut Frame, session: &HeatmapSession, fetch_secs: Option<f64>, area: Rect) {
    let badge = match session.status() {
        Status::Loading => Span::styled(
            format!(" LOADING {:.1}s ", fetch_secs.unwrap_or(0.0)),
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        Status::Ready => Span::styled(" READY ", Style::default().bg(Color::Green).fg(Color::Black)),
        Status::NoData => Span::styled(
            " NO DATA ",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        Status::Failed(_) => Span::styled(" ERROR ", Style::default().bg(Color::Red).fg(Color::White)),
    };

    let settings = session.settings();
    let (from, to) = session.zoom().current();
    let mut spans = vec![
        Span::styled(
            "heatscope",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        badge,
        Span::raw(format!(
            " {} → {} │ {} buckets │ {} │ by {} │ {}",
            from.format("%Y-%m-%d %H:%M:%S"),
            to.format("%Y-%m-%d %H:%M:%S"),
            session.interval().label(),
            settings.metric.label(),
            settings.category_mode.label(),
            settings.scale.label(),
        )),
    ];
    if let Some(cluster) = &settings.cluster {
        spans.push(Span::raw(format!(" │ cluster {cluster}")));
    }
    if session.zoom().is_zoomed() {
        spans.push(Span::styled(
            " [zoomed]",
            Style::default().fg(Color::Magenta),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_main(frame: &mut Frame, session: &mut HeatmapSession, area: Rect) {
    let settings = session.settings();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(
            " {} by {} ",
            settings.metric.label(),
            settings.category_mode.label()
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if session.loaded().is_none() {
        let msg = Paragraph::new(format!(" {}", placeholder_text(session.status())))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(msg, inner);
        return;
    }

    render_grid(frame, session, inner);
}

fn label_width(grid: &GridModel) -> usize {
    let longest = (1..grid.rows())
        .filter_map(|row| grid.cell(row, 0))
        .map(|cell| cell.text.chars().count())
        .max()
        .unwrap_or(0);
    longest.clamp(MIN_LABEL_WIDTH, MAX_LABEL_WIDTH) + 1
}

fn render_grid(frame: &mut Frame, session: &mut HeatmapSession, area: Rect) {
    let Some(label_w) = session.loaded().map(|l| label_width(&l.grid)) else {
        return;
    };
    // One row for time headers and one for the horizontal scrollbar;
    // one column for the vertical scrollbar
    let data_rows = (area.height as usize).saturating_sub(2);
    let data_cols = (area.width as usize).saturating_sub(label_w + 1) / CELL_WIDTH;
    session.set_viewport(data_rows, data_cols);

    let Some(loaded) = session.loaded() else {
        return;
    };
    let grid = &loaded.grid;
    let nav = &loaded.navigator;
    let selection = nav.selection();
    let categories = grid.rows() - 1;
    let buckets = grid.cols() - 1;
    let row_range = nav.row_offset()..(nav.row_offset() + data_rows).min(categories);
    let col_range = nav.col_offset()..(nav.col_offset() + data_cols).min(buckets);

    let mut lines = Vec::with_capacity(row_range.len() + 1);
    lines.push(header_line(grid, selection, label_w, col_range.clone()));

    for row in row_range.map(|r| r + 1) {
        let mut spans = Vec::with_capacity(col_range.len() + 1);
        if let Some(label) = grid.cell(row, 0) {
            spans.push(Span::styled(
                fit(&label.text, label_w - 1) + " ",
                to_style(label.effective_style()),
            ));
        }
        for col in col_range.clone().map(|c| c + 1) {
            if let Some(cell) = grid.cell(row, col) {
                spans.push(Span::styled(
                    cell.display_text().to_string(),
                    to_style(cell.effective_style()),
                ));
            }
        }
        lines.push(Line::from(spans));
    }

    let grid_area = Rect {
        width: area.width.saturating_sub(1),
        height: area.height.saturating_sub(1),
        ..area
    };
    frame.render_widget(Paragraph::new(lines), grid_area);

    let scroll = nav.scroll();
    if categories > data_rows {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        let mut state = ScrollbarState::new(scroll.vertical.length).position(scroll.vertical.position);
        let bar_area = Rect {
            x: area.x + area.width.saturating_sub(1),
            y: area.y + 1,
            width: 1,
            height: area.height.saturating_sub(2),
        };
        frame.render_stateful_widget(scrollbar, bar_area, &mut state);
    }
    if buckets > data_cols {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::HorizontalBottom)
            .begin_symbol(Some("←"))
            .end_symbol(Some("→"))
            .track_symbol(Some("─"))
            .thumb_symbol("█");
        let mut state =
            ScrollbarState::new(scroll.horizontal.length).position(scroll.horizontal.position);
        let bar_area = Rect {
            x: area.x + label_w as u16,
            y: area.y + area.height.saturating_sub(1),
            width: area.width.saturating_sub(label_w as u16 + 1),
            height: 1,
        };
        frame.render_stateful_widget(scrollbar, bar_area, &mut state);
    }
}

/// Corner plus time labels. Labels are wider than a cell, so columns are
/// grouped and each group shows the label of its first bucket, or of the
/// selected bucket when the cursor is on the header row.
fn header_line(
    grid: &GridModel,
    selection: SelectionState,
    label_w: usize,
    cols: std::ops::Range<usize>,
) -> Line<'static> {
    let mut spans = Vec::new();
    if let Some(corner) = grid.cell(0, 0) {
        spans.push(Span::styled(
            fit(&corner.text, label_w - 1) + " ",
            to_style(corner.effective_style()),
        ));
    }

    let label_len = grid
        .cell(0, 1)
        .map(|c| c.text.chars().count())
        .unwrap_or(CELL_WIDTH);
    let step = (label_len + 1).div_ceil(CELL_WIDTH).max(1);
    let visible: Vec<usize> = cols.map(|c| c + 1).collect();

    for group in visible.chunks(step) {
        let shown = group
            .iter()
            .copied()
            .find(|&col| selection.row == 0 && selection.col == col)
            .unwrap_or(group[0]);
        if let Some(cell) = grid.cell(0, shown) {
            spans.push(Span::styled(
                fit(&cell.text, group.len() * CELL_WIDTH),
                to_style(cell.effective_style()),
            ));
        }
    }
    Line::from(spans)
}

fn render_legend(frame: &mut Frame, session: &HeatmapSession, area: Rect) {
    let mut spans = Vec::new();
    let legend = session.legend(LEGEND_SAMPLES);
    if !legend.is_empty() {
        spans.push(Span::styled(" scale ", Style::default().fg(Color::DarkGray)));
        for entry in legend {
            spans.push(Span::styled("  ", Style::default().bg(to_color(entry.color))));
            spans.push(Span::raw(format!(" {} ", format_value(entry.value))));
        }
    }

    if let Status::Failed(msg) = session.status() {
        spans.push(Span::styled(
            format!(" │ {msg}"),
            Style::default().fg(Color::Red),
        ));
    } else if let Some(notice) = session.notice() {
        spans.push(Span::styled(
            format!(" │ {notice}"),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_footer(frame: &mut Frame, session: &HeatmapSession, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().bg(Color::DarkGray));

    let spans = if session.menu().is_some() {
        vec![
            key(" ↑/↓ "),
            Span::raw(" choose "),
            key(" Enter "),
            Span::raw(" run "),
            key(" Esc "),
            Span::raw(" cancel "),
        ]
    } else {
        vec![
            key(" q "),
            Span::raw(" quit "),
            key(" hjkl "),
            Span::raw(" move "),
            key(" +/- "),
            Span::raw(" zoom "),
            key(" 0 "),
            Span::raw(" reset "),
            key(" Enter "),
            Span::raw(" actions "),
            key(" s "),
            Span::raw(" scale "),
            key(" m "),
            Span::raw(" metric "),
            key(" c "),
            Span::raw(" category "),
            key(" r "),
            Span::raw(" refresh "),
        ]
    };

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_menu(frame: &mut Frame, menu: &ActionMenu, area: Rect) {
    let scope = if menu.scope.category_value.is_empty() {
        "all categories".to_string()
    } else {
        fit(&menu.scope.category_value, 28).trim_end().to_string()
    };
    let width = 34u16.min(area.width);
    let height = (menu.items.len() as u16 + 4).min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    let mut lines: Vec<Line> = menu
        .items
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let style = if i == menu.selected {
                Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!(" {} ", action.label()), style))
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" {scope}"),
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Action ");
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn to_style(style: CellStyle) -> Style {
    let mut out = Style::default();
    if let Some(fg) = style.fg {
        out = out.fg(to_color(fg));
    }
    if let Some(bg) = style.bg {
        out = out.bg(to_color(bg));
    }
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.dim {
        out = out.add_modifier(Modifier::DIM);
    }
    if style.reversed {
        out = out.add_modifier(Modifier::REVERSED);
    }
    out
}

/// Truncate or pad `text` to exactly `width` characters
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        if width > 0 {
            out.push('…');
        }
        out
    } else {
        format!("{text:<width$}")
    }
}

/// Compact value for the legend (1.2k, 3.4M, ...)
fn format_value(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}G", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}k", value / 1e3)
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_text_uses_error_as_is() {
        let err = crate::error::Error::Query("no such table: query_log".into());
        let status = Status::Failed(err.to_string());
        assert_eq!(placeholder_text(&status), "Query failed: no such table: query_log");
        assert_eq!(placeholder_text(&Status::NoData), NO_DATA_MESSAGE);
        assert_eq!(placeholder_text(&Status::Loading), "Loading...");
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 4), "abc…");
        assert_eq!(fit("abc", 0), "");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(1500.0), "1.5k");
        assert_eq!(format_value(2_500_000.0), "2.5M");
    }

    #[test]
    fn test_to_style_maps_modifiers() {
        let style = to_style(CellStyle {
            bg: Some(Rgb(1, 2, 3)),
            bold: true,
            reversed: true,
            ..CellStyle::default()
        });
        assert_eq!(style.bg, Some(Color::Rgb(1, 2, 3)));
        assert!(style.add_modifier.contains(Modifier::BOLD | Modifier::REVERSED));
        assert!(!style.add_modifier.contains(Modifier::DIM));
    }
}
