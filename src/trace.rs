//! Resolution tracing and telemetry.
//!
//! Every resolution carries a [`ResolutionTrace`] sink shared down the
//! context chain. Each pipeline stage records one [`TraceEntry`]; on failure
//! the entries are copied into the error and into the context metadata, never
//! mutated after the fact. [`StepTelemetry`] observers receive the same
//! entries live.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::DiError;

/// Pipeline states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    ContextualLookup,
    DefinitionLookup,
    Autowire,
    Evaluate,
    Instantiate,
    Success,
    NotFound,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ContextualLookup => "contextual_lookup",
            Stage::DefinitionLookup => "definition_lookup",
            Stage::Autowire => "autowire",
            Stage::Evaluate => "evaluate",
            Stage::Instantiate => "instantiate",
            Stage::Success => "success",
            Stage::NotFound => "not_found",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageOutcome {
    Hit,
    Miss,
    Success,
    NotFound,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Hit => f.write_str("hit"),
            StageOutcome::Miss => f.write_str("miss"),
            StageOutcome::Success => f.write_str("success"),
            StageOutcome::NotFound => f.write_str("not_found"),
        }
    }
}

/// One recorded pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub service_id: String,
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub depth: usize,
    /// Elapsed time since the root resolution started.
    pub elapsed: Duration,
    pub note: Option<String>,
}

impl TraceEntry {
    pub fn new(service_id: impl Into<String>, stage: Stage, outcome: StageOutcome, depth: usize) -> Self {
        Self {
            service_id: service_id.into(),
            stage,
            outcome,
            depth,
            elapsed: Duration::ZERO,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.stage, self.service_id, self.outcome
        )?;
        if let Some(note) = &self.note {
            write!(f, " ({note})")?;
        }
        Ok(())
    }
}

static NEXT_TRACE_ID: AtomicU64 = AtomicU64::new(1);

/// Append-only trace sink shared across one resolution's context chain.
pub struct ResolutionTrace {
    trace_id: String,
    started: Instant,
    entries: Mutex<Vec<TraceEntry>>,
}

impl ResolutionTrace {
    pub fn new() -> Arc<Self> {
        let n = NEXT_TRACE_ID.fetch_add(1, Ordering::Relaxed);
        Arc::new(Self {
            trace_id: format!("res-{n}"),
            started: Instant::now(),
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub(crate) fn record(&self, mut entry: TraceEntry) -> TraceEntry {
        entry.elapsed = self.started.elapsed();
        self.entries.lock().unwrap().push(entry.clone());
        entry
    }

    /// A copy of the recorded entries.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Serializes the recorded entries for diagnostics and metadata.
    pub fn render(&self) -> String {
        serde_json::to_string(&self.entries()).unwrap_or_default()
    }
}

impl fmt::Debug for ResolutionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionTrace")
            .field("trace_id", &self.trace_id)
            .field("entries", &self.len())
            .finish()
    }
}

/// Observer of per-stage outcomes and timing.
///
/// Telemetry calls are made synchronously during resolution; keep
/// implementations lightweight.
pub trait StepTelemetry: Send + Sync {
    /// Called for every recorded pipeline step.
    fn step(&self, trace_id: &str, entry: &TraceEntry);

    /// Called when a root resolution returns a value.
    fn finished(&self, trace_id: &str, service_id: &str, elapsed: Duration) {
        let _ = (trace_id, service_id, elapsed);
    }

    /// Called when a root resolution fails.
    fn failed(&self, trace_id: &str, service_id: &str, err: &DiError) {
        let _ = (trace_id, service_id, err);
    }
}

/// Telemetry sink that forwards steps to the `tracing` ecosystem.
#[derive(Debug, Default)]
pub struct LogTelemetry;

impl LogTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl StepTelemetry for LogTelemetry {
    fn step(&self, trace_id: &str, entry: &TraceEntry) {
        debug!(
            trace_id,
            service_id = %entry.service_id,
            stage = %entry.stage,
            outcome = %entry.outcome,
            depth = entry.depth,
            "resolution step"
        );
    }

    fn finished(&self, trace_id: &str, service_id: &str, elapsed: Duration) {
        debug!(trace_id, service_id, ?elapsed, "resolution finished");
    }

    fn failed(&self, trace_id: &str, service_id: &str, err: &DiError) {
        error!(trace_id, service_id, error = %err.kind(), "resolution failed");
    }
}

/// Telemetry sink that aggregates counters for post-run analysis.
#[derive(Debug, Default)]
pub struct MetricsTelemetry {
    steps: AtomicU64,
    resolutions: AtomicU64,
    failures: AtomicU64,
    total_nanos: AtomicU64,
}

impl MetricsTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    pub fn average_time(&self) -> Option<Duration> {
        let count = self.resolutions();
        if count == 0 {
            return None;
        }
        Some(Duration::from_nanos(
            self.total_nanos.load(Ordering::Relaxed) / count,
        ))
    }

    pub fn reset(&self) {
        self.steps.store(0, Ordering::Relaxed);
        self.resolutions.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.total_nanos.store(0, Ordering::Relaxed);
    }
}

impl StepTelemetry for MetricsTelemetry {
    fn step(&self, _trace_id: &str, _entry: &TraceEntry) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    fn finished(&self, _trace_id: &str, _service_id: &str, elapsed: Duration) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.total_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    fn failed(&self, _trace_id: &str, _service_id: &str, _err: &DiError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// The registered telemetry sinks, with near-zero overhead when empty.
#[derive(Default, Clone)]
pub(crate) struct TelemetrySet {
    sinks: Vec<Arc<dyn StepTelemetry>>,
}

impl TelemetrySet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, sink: Arc<dyn StepTelemetry>) {
        self.sinks.push(sink);
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub(crate) fn step(&self, trace_id: &str, entry: &TraceEntry) {
        for sink in &self.sinks {
            sink.step(trace_id, entry);
        }
    }

    pub(crate) fn finished(&self, trace_id: &str, service_id: &str, elapsed: Duration) {
        for sink in &self.sinks {
            sink.finished(trace_id, service_id, elapsed);
        }
    }

    pub(crate) fn failed(&self, trace_id: &str, service_id: &str, err: &DiError) {
        for sink in &self.sinks {
            sink.failed(trace_id, service_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_ids_are_unique() {
        let a = ResolutionTrace::new();
        let b = ResolutionTrace::new();
        assert_ne!(a.trace_id(), b.trace_id());
    }

    #[test]
    fn record_stamps_elapsed_and_copies() {
        let trace = ResolutionTrace::new();
        trace.record(TraceEntry::new("svc", Stage::Autowire, StageOutcome::Hit, 0));
        trace.record(
            TraceEntry::new("svc", Stage::Instantiate, StageOutcome::Success, 0)
                .with_note("built"),
        );

        let entries = trace.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].note.as_deref(), Some("built"));

        let rendered = trace.render();
        assert!(rendered.contains("Autowire"));
        assert!(rendered.contains("Instantiate"));
    }

    #[test]
    fn metrics_telemetry_aggregates() {
        let metrics = MetricsTelemetry::new();
        let entry = TraceEntry::new("svc", Stage::Evaluate, StageOutcome::Success, 0);
        metrics.step("t", &entry);
        metrics.step("t", &entry);
        metrics.finished("t", "svc", Duration::from_millis(4));

        assert_eq!(metrics.steps(), 2);
        assert_eq!(metrics.resolutions(), 1);
        assert!(metrics.average_time().is_some());

        metrics.reset();
        assert_eq!(metrics.steps(), 0);
        assert!(metrics.average_time().is_none());
    }
}
