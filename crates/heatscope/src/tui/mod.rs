mod app;
pub mod sink;
mod ui;

use crate::error::Result;
use crate::heatmap::HeatmapSession;
use crate::source::MetricSource;

pub use app::App;
pub use sink::{ActionSink, JsonLinesSink, LogSink};

/// Run the interactive heatmap until the user quits
pub fn run<S: MetricSource + 'static>(
    session: HeatmapSession,
    source: S,
    sink: Box<dyn ActionSink>,
) -> Result<()> {
    let mut app = App::new(session, source, sink);
    app.run()
}
