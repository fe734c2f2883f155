//! Where drill-down requests go once the user picks an action.

use crate::error::Result;
use crate::heatmap::ActionRequest;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub trait ActionSink {
    fn dispatch(&mut self, request: &ActionRequest) -> Result<()>;
}

/// Records requests in the log only
#[derive(Debug, Default)]
pub struct LogSink;

impl ActionSink for LogSink {
    fn dispatch(&mut self, request: &ActionRequest) -> Result<()> {
        tracing::info!(
            action = request.action.label(),
            category = %request.category_value,
            from = %request.from_time,
            to = %request.to_time,
            "action requested"
        );
        Ok(())
    }
}

/// Appends one JSON object per request to a file
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(JsonLinesSink {
            writer: BufWriter::new(file),
        })
    }
}

impl ActionSink for JsonLinesSink {
    fn dispatch(&mut self, request: &ActionRequest) -> Result<()> {
        LogSink.dispatch(request)?;
        serde_json::to_writer(&mut self.writer, request)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::{Action, CategoryMode, TraceType};
    use chrono::DateTime;

    #[test]
    fn test_json_lines_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.jsonl");
        let request = ActionRequest {
            action: Action::Explain,
            category_mode: CategoryMode::QueryHash,
            category_value: "abc".into(),
            from_time: DateTime::from_timestamp(0, 0).unwrap(),
            to_time: DateTime::from_timestamp(60, 0).unwrap(),
            cluster: None,
            trace_type: TraceType::Real,
        };

        let mut sink = JsonLinesSink::create(&path).unwrap();
        sink.dispatch(&request).unwrap();
        sink.dispatch(&request).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["action"], "explain");
        assert_eq!(value["category_mode"], "query_hash");
        assert_eq!(value["from_time"], "1970-01-01T00:00:00Z");
        assert_eq!(value["trace_type"], "real");
    }
}
