//! Observation Spans
//!
//! Per-call observation spans for model usage. Each model call is wrapped
//! in a named span ("LLM Call", "Structured LLM Call"); when the
//! observability backend is unconfigured the tracer is a no-op.
//!
//! Thread-safe: counters are atomics, per-name aggregates sit behind an
//! RwLock.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::debug;

use crate::config::ObservabilityConfig;

// =============================================================================
// Tracer
// =============================================================================

/// Span recorder for model calls
pub struct Tracer {
    enabled: bool,
    host: String,
    total_spans: AtomicU64,
    total_duration_ms: AtomicU64,
    /// name → (count, cumulative ms)
    by_name: RwLock<HashMap<String, (u64, u64)>>,
}

impl Tracer {
    /// Build a tracer from configuration; unconfigured backends yield the
    /// no-op tracer
    pub fn from_config(config: &ObservabilityConfig) -> Self {
        if config.is_configured() {
            Self {
                enabled: true,
                host: config.host.clone(),
                total_spans: AtomicU64::new(0),
                total_duration_ms: AtomicU64::new(0),
                by_name: RwLock::new(HashMap::new()),
            }
        } else {
            Self::noop()
        }
    }

    /// A tracer that records nothing
    pub fn noop() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            total_spans: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            by_name: RwLock::new(HashMap::new()),
        }
    }

    /// Open a named observation span; recording happens when the guard drops
    pub fn span(&self, name: &'static str) -> SpanGuard<'_> {
        SpanGuard {
            tracer: self,
            name,
            start: Instant::now(),
        }
    }

    fn record(&self, name: &str, elapsed_ms: u64) {
        if !self.enabled {
            return;
        }
        self.total_spans.fetch_add(1, Ordering::Relaxed);
        self.total_duration_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        if let Ok(mut map) = self.by_name.write() {
            let entry = map.entry(name.to_string()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += elapsed_ms;
        }
        debug!(target: "observe", span = name, elapsed_ms, host = %self.host, "span recorded");
    }

    /// Aggregated span statistics
    pub fn summary(&self) -> TraceSummary {
        let by_name = self
            .by_name
            .read()
            .map(|map| {
                let mut rows: Vec<SpanStats> = map
                    .iter()
                    .map(|(name, (count, ms))| SpanStats {
                        name: name.clone(),
                        count: *count,
                        total_ms: *ms,
                    })
                    .collect();
                rows.sort_by(|a, b| a.name.cmp(&b.name));
                rows
            })
            .unwrap_or_default();

        TraceSummary {
            total_spans: self.total_spans.load(Ordering::Relaxed),
            total_duration_ms: self.total_duration_ms.load(Ordering::Relaxed),
            by_name,
        }
    }
}

/// RAII guard recording a span on drop
pub struct SpanGuard<'a> {
    tracer: &'a Tracer,
    name: &'static str,
    start: Instant,
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        self.tracer.record(self.name, elapsed_ms);
    }
}

/// Per-name span statistics
#[derive(Debug, Clone)]
pub struct SpanStats {
    pub name: String,
    pub count: u64,
    pub total_ms: u64,
}

/// Aggregate trace statistics
#[derive(Debug, Clone, Default)]
pub struct TraceSummary {
    pub total_spans: u64,
    pub total_duration_ms: u64,
    pub by_name: Vec<SpanStats>,
}
