//! Background fetch cycles tagged with a generation id.
//!
//! Each `start` bumps the generation and runs the query plus matrix build on
//! a short-lived thread. Only a response carrying the latest generation is
//! handed back; anything older is dropped when drained.

use super::matrix::{BuildOutcome, HeatmapMatrix};
use crate::error::{Error, Result};
use crate::source::{MetricSource, QueryRequest};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

/// Result of one fetch cycle
#[derive(Debug)]
pub struct FetchResponse {
    pub generation: u64,
    pub elapsed: Duration,
    pub outcome: Result<BuildOutcome>,
}

pub struct Fetcher<S> {
    source: Arc<S>,
    tx: Sender<FetchResponse>,
    rx: Receiver<FetchResponse>,
    generation: u64,
    pending: bool,
}

impl<S: MetricSource + 'static> Fetcher<S> {
    pub fn new(source: S) -> Self {
        let (tx, rx) = mpsc::channel();
        Fetcher {
            source: Arc::new(source),
            tx,
            rx,
            generation: 0,
            pending: false,
        }
    }

    /// Latest generation issued
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the latest generation has not been delivered yet
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Start a fetch cycle, superseding any in flight
    pub fn start(&mut self, request: QueryRequest) -> u64 {
        self.generation += 1;
        self.pending = true;
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();

        tracing::debug!(
            generation,
            from = %request.from,
            to = %request.to,
            bucket_seconds = request.bucket_seconds,
            "starting fetch"
        );

        let spawned = thread::Builder::new()
            .name(format!("fetch-{generation}"))
            .spawn(move || {
                let started = Instant::now();
                let outcome = run_cycle(source.as_ref(), &request);
                // Receiver is gone only when the viewer has shut down
                let _ = tx.send(FetchResponse {
                    generation,
                    elapsed: started.elapsed(),
                    outcome,
                });
            });

        if let Err(e) = spawned {
            tracing::error!(generation, error = %e, "failed to spawn fetch worker");
            let _ = self.tx.send(FetchResponse {
                generation,
                elapsed: Duration::ZERO,
                outcome: Err(Error::Io(e)),
            });
        }
        generation
    }

    /// Drain finished cycles without blocking.
    /// Returns the response for the latest generation, if it has arrived.
    pub fn poll(&mut self) -> Option<FetchResponse> {
        let mut current = None;
        loop {
            match self.rx.try_recv() {
                Ok(response) => {
                    if let Some(accepted) = self.accept(response) {
                        current = Some(accepted);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        current
    }

    /// Block until the latest generation arrives
    pub fn wait(&mut self, timeout: Duration) -> Result<FetchResponse> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(response) => {
                    if let Some(accepted) = self.accept(response) {
                        return Ok(accepted);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::Query(format!(
                        "no result after {}",
                        humantime::format_duration(timeout)
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::FetchDisconnected(self.generation));
                }
            }
        }
    }

    fn accept(&mut self, response: FetchResponse) -> Option<FetchResponse> {
        if response.generation != self.generation {
            tracing::debug!(
                stale = response.generation,
                current = self.generation,
                "discarding stale fetch result"
            );
            return None;
        }
        self.pending = false;
        tracing::debug!(
            generation = response.generation,
            elapsed_ms = response.elapsed.as_millis() as u64,
            ok = response.outcome.is_ok(),
            "fetch finished"
        );
        Some(response)
    }
}

/// Query and build, turning a panicking source into an error
fn run_cycle<S: MetricSource + ?Sized>(source: &S, request: &QueryRequest) -> Result<BuildOutcome> {
    match panic::catch_unwind(AssertUnwindSafe(|| source.fetch(request))) {
        Ok(rows) => rows.map(HeatmapMatrix::build),
        Err(_) => Err(Error::Query("metric source panicked".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::matrix::DataPoint;
    use chrono::DateTime;
    use std::sync::Mutex;

    fn request(tag: i64) -> QueryRequest {
        QueryRequest {
            metric_expression: "COUNT(*)".into(),
            category_expression: "host".into(),
            cluster: None,
            from: DateTime::from_timestamp(tag, 0).unwrap(),
            to: DateTime::from_timestamp(tag + 60, 0).unwrap(),
            bucket_seconds: 60,
            category_filter: None,
            category_limit: None,
        }
    }

    /// Returns one row tagged with the request's start time; requests
    /// starting at 0 are held until released
    struct GatedSource {
        gate: Mutex<Receiver<()>>,
    }

    impl MetricSource for GatedSource {
        fn fetch(&self, request: &QueryRequest) -> Result<Vec<DataPoint>> {
            if request.from.timestamp() == 0 {
                let gate = self.gate.lock().unwrap();
                let _ = gate.recv();
            }
            Ok(vec![DataPoint::new(request.from, "host", 1.0)])
        }
    }

    struct FailingSource;

    impl MetricSource for FailingSource {
        fn fetch(&self, _request: &QueryRequest) -> Result<Vec<DataPoint>> {
            Err(Error::Query("connection refused".into()))
        }
    }

    struct EmptySource;

    impl MetricSource for EmptySource {
        fn fetch(&self, _request: &QueryRequest) -> Result<Vec<DataPoint>> {
            Ok(Vec::new())
        }
    }

    struct PanickingSource;

    impl MetricSource for PanickingSource {
        fn fetch(&self, _request: &QueryRequest) -> Result<Vec<DataPoint>> {
            panic!("boom")
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_stale_result_is_discarded() {
        let (release, gate) = mpsc::channel();
        let mut fetcher = Fetcher::new(GatedSource {
            gate: Mutex::new(gate),
        });

        let first = fetcher.start(request(0));
        let second = fetcher.start(request(600));
        assert_eq!((first, second), (1, 2));

        let response = fetcher.wait(TIMEOUT).unwrap();
        assert_eq!(response.generation, 2);
        let matrix = response.outcome.unwrap().into_matrix().unwrap();
        assert_eq!(matrix.timestamps()[0].timestamp(), 600);
        assert!(!fetcher.is_pending());

        // Let the superseded cycle finish; it must never surface
        release.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < deadline {
            assert!(fetcher.poll().is_none());
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_errors_are_delivered() {
        let mut fetcher = Fetcher::new(FailingSource);
        fetcher.start(request(60));
        let response = fetcher.wait(TIMEOUT).unwrap();
        assert!(matches!(response.outcome, Err(Error::Query(_))));
    }

    #[test]
    fn test_empty_rows_report_no_data() {
        let mut fetcher = Fetcher::new(EmptySource);
        fetcher.start(request(60));
        let response = fetcher.wait(TIMEOUT).unwrap();
        assert!(matches!(response.outcome, Ok(BuildOutcome::Empty)));
    }

    #[test]
    fn test_panicking_source_becomes_error() {
        let mut fetcher = Fetcher::new(PanickingSource);
        fetcher.start(request(60));
        let response = fetcher.wait(TIMEOUT).unwrap();
        assert!(response.outcome.is_err());
    }

    #[test]
    fn test_poll_without_fetch_is_empty() {
        let mut fetcher = Fetcher::new(EmptySource);
        assert!(fetcher.poll().is_none());
        assert_eq!(fetcher.generation(), 0);
        assert!(!fetcher.is_pending());
    }
}
