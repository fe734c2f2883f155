use super::sink::ActionSink;
use super::ui;
use crate::error::Result;
use crate::heatmap::{Effect, Fetcher, HeatmapSession, Input};
use crate::source::MetricSource;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::*};
use std::io::{self, stdout};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const FRAME_INTERVAL: Duration = Duration::from_millis(250);

pub struct App<S> {
    pub session: HeatmapSession,
    fetcher: Fetcher<S>,
    sink: Box<dyn ActionSink>,
    running: bool,
    last_draw: Instant,
    /// When the pending fetch was issued
    fetch_started: Option<Instant>,
}

impl<S: MetricSource + 'static> App<S> {
    pub fn new(session: HeatmapSession, source: S, sink: Box<dyn ActionSink>) -> Self {
        App {
            session,
            fetcher: Fetcher::new(source),
            sink,
            running: true,
            last_draw: Instant::now(),
            fetch_started: None,
        }
    }

    /// Time since the pending fetch started, if one is in flight
    pub fn fetch_elapsed(&self) -> Option<Duration> {
        self.fetch_started.map(|t| t.elapsed())
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        self.refetch();
        terminal.draw(|frame| ui::render(frame, self))?;

        while self.running {
            let mut needs_redraw = false;

            if let Some(response) = self.fetcher.poll() {
                self.fetch_started = None;
                self.session.apply(response.outcome);
                needs_redraw = true;
            }

            if event::poll(POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        needs_redraw |= self.handle_key(key.code, key.modifiers);
                    }
                    Event::Resize(_, _) => needs_redraw = true,
                    _ => {}
                }
            }

            // Keep the loading indicator ticking
            let ticking = self.fetcher.is_pending() && self.last_draw.elapsed() >= FRAME_INTERVAL;
            if needs_redraw || ticking {
                terminal.draw(|frame| ui::render(frame, self))?;
                self.last_draw = Instant::now();
            }
        }

        Ok(())
    }

    /// Returns whether the screen changed
    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);

        let input = match key {
            KeyCode::Char('c') if ctrl => {
                self.running = false;
                return false;
            }
            KeyCode::Char('q') => {
                self.running = false;
                return false;
            }
            KeyCode::Up | KeyCode::Char('k') => Input::Up,
            KeyCode::Down | KeyCode::Char('j') => Input::Down,
            KeyCode::Left | KeyCode::Char('h') => Input::Left,
            KeyCode::Right | KeyCode::Char('l') => Input::Right,
            KeyCode::PageUp => Input::PageUp,
            KeyCode::PageDown => Input::PageDown,
            KeyCode::Home | KeyCode::Char('g') => Input::Home,
            KeyCode::End | KeyCode::Char('G') => Input::End,
            KeyCode::Char('+') | KeyCode::Char('=') => Input::ZoomIn,
            KeyCode::Char('-') => Input::ZoomOut,
            KeyCode::Char('0') => Input::ZoomReset,
            KeyCode::Enter => Input::Confirm,
            KeyCode::Esc => Input::Cancel,
            KeyCode::Char('s') => Input::CycleScale,
            KeyCode::Char('m') => Input::CycleMetric,
            KeyCode::Char('c') => Input::CycleCategory,
            KeyCode::Char('r') => Input::Refresh,
            _ => return false,
        };

        match self.session.handle(input) {
            Effect::None => false,
            Effect::Redraw => true,
            Effect::Refetch => {
                self.refetch();
                true
            }
            Effect::Dispatch(request) => {
                match self.sink.dispatch(&request) {
                    Ok(()) => self.session.set_notice(format!(
                        "{}: {} {} .. {}",
                        request.action.label(),
                        if request.category_value.is_empty() {
                            "all"
                        } else {
                            &request.category_value
                        },
                        request.from_time.format("%Y-%m-%d %H:%M:%S"),
                        request.to_time.format("%H:%M:%S"),
                    )),
                    Err(e) => {
                        tracing::error!(error = %e, "failed to dispatch action");
                        self.session.set_notice(format!("Dispatch failed: {e}"));
                    }
                }
                true
            }
        }
    }

    fn refetch(&mut self) {
        let request = self.session.begin_fetch();
        self.fetcher.start(request);
        self.fetch_started = Some(Instant::now());
    }
}
