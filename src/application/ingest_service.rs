// Ingest service - Source lines through the parser into the store
use crate::application::line_parser::parse_line;
use crate::application::ports::{AppendSink, LineSource};
use crate::application::telemetry_store::TelemetryStore;
use crate::domain::error::{DecodeError, SourceError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Monotonic seconds since the clock was started.
#[derive(Debug, Clone, Copy)]
pub struct ProcessClock {
    start: Instant,
}

impl ProcessClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceStatus {
    #[default]
    Running,
    Ended,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestCounters {
    pub lines_received: u64,
    pub lines_undecodable: u64,
    pub lines_rejected: u64,
    pub samples_stored: u64,
    pub samples_refused: u64,
    pub sink_failures: u64,
}

/// Counters shared between the ingest loop and whoever reports on it.
#[derive(Debug, Default)]
pub struct IngestStats {
    lines_received: AtomicU64,
    lines_undecodable: AtomicU64,
    lines_rejected: AtomicU64,
    samples_stored: AtomicU64,
    samples_refused: AtomicU64,
    sink_failures: AtomicU64,
    status: Mutex<SourceStatus>,
}

impl IngestStats {
    pub fn counters(&self) -> IngestCounters {
        IngestCounters {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            lines_undecodable: self.lines_undecodable.load(Ordering::Relaxed),
            lines_rejected: self.lines_rejected.load(Ordering::Relaxed),
            samples_stored: self.samples_stored.load(Ordering::Relaxed),
            samples_refused: self.samples_refused.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }

    pub fn status(&self) -> SourceStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_status(&self, status: SourceStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Strips the line terminator and decodes as UTF-8.
pub fn decode_line(raw: &[u8]) -> Result<&str, DecodeError> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw).map_err(|e| DecodeError {
        valid_up_to: e.valid_up_to(),
        len: raw.len(),
    })
}

pub struct IngestService {
    store: Arc<TelemetryStore>,
    stats: Arc<IngestStats>,
    clock: ProcessClock,
    sink: Option<Box<dyn AppendSink>>,
}

impl IngestService {
    pub fn new(
        store: Arc<TelemetryStore>,
        stats: Arc<IngestStats>,
        clock: ProcessClock,
        sink: Option<Box<dyn AppendSink>>,
    ) -> Self {
        Self {
            store,
            stats,
            clock,
            sink,
        }
    }

    /// Consumes the source until end of stream or a transport failure.
    ///
    /// Bad lines are counted and skipped; only a [`SourceError`] ends the loop early.
    pub async fn run(&mut self, source: &mut dyn LineSource) -> Result<IngestCounters, SourceError> {
        tracing::info!(source = %source.describe(), "Starting ingestion");
        self.stats.set_status(SourceStatus::Running);

        loop {
            let raw = match source.next_line().await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    self.stats.set_status(SourceStatus::Ended);
                    let counters = self.stats.counters();
                    tracing::info!(
                        source = %source.describe(),
                        received = counters.lines_received,
                        stored = counters.samples_stored,
                        rejected = counters.lines_rejected,
                        "Source reached end of stream"
                    );
                    return Ok(counters);
                }
                Err(e) => {
                    self.stats.set_status(SourceStatus::Failed(e.to_string()));
                    tracing::error!(source = %source.describe(), error = %e, "Source failed");
                    return Err(e);
                }
            };

            IngestStats::bump(&self.stats.lines_received);
            self.handle_line(&raw).await;
        }
    }

    async fn handle_line(&mut self, raw: &[u8]) {
        let line = match decode_line(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                IngestStats::bump(&self.stats.lines_undecodable);
                tracing::debug!(error = %e, "Dropping undecodable line");
                return;
            }
        };
        if line.is_empty() {
            return;
        }

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.append(line).await {
                IngestStats::bump(&self.stats.sink_failures);
                tracing::warn!(error = %e, "Failed to append line to log");
            }
        }

        let sample = match parse_line(line, self.clock.now()) {
            Ok(sample) => sample,
            Err(e) => {
                IngestStats::bump(&self.stats.lines_rejected);
                tracing::warn!(line, error = %e, "Invalid line");
                return;
            }
        };

        let key = sample.key();
        match self.store.ingest(sample) {
            Ok(receipt) => {
                IngestStats::bump(&self.stats.samples_stored);
                if receipt.new_series {
                    tracing::info!(series = %key, "Discovered new series");
                }
                tracing::trace!(series = %key, timestamp = receipt.stored_at, "Stored sample");
            }
            Err(e) => {
                IngestStats::bump(&self.stats.samples_refused);
                tracing::warn!(series = %key, error = %e, "Store refused sample");
            }
        }
    }
}
