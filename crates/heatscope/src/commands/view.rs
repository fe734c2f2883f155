use super::require_database;
use crate::cli::ViewArgs;
use crate::error::Result;
use crate::heatmap::HeatmapSession;
use crate::source::SqliteSource;
use crate::tui::{self, ActionSink, JsonLinesSink, LogSink};
use chrono::Utc;
use std::path::Path;

pub fn run(db: &Path, args: &ViewArgs, actions_out: Option<&Path>) -> Result<()> {
    require_database(db)?;

    let (from, to) = args.window(Utc::now())?;
    let session = HeatmapSession::new(args.settings(), from, to)?;

    let sink: Box<dyn ActionSink> = match actions_out {
        Some(path) => Box::new(JsonLinesSink::create(path)?),
        None => Box::new(LogSink),
    };

    tracing::info!(
        db = %db.display(),
        %from,
        %to,
        metric = args.metric.label(),
        category = args.category.label(),
        "opening heatmap view"
    );
    tui::run(session, SqliteSource::new(db), sink)
}
