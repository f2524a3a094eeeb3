//! Per-provider attempt metrics
//!
//! Recording is a no-op until [`enable`] is called.

use crate::config::MetricsFormat;
use crate::error::{ProviderError, Result};
use crate::provider::ProviderKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::info;

static METRICS: OnceLock<MetricsInner> = OnceLock::new();

/// Start aggregating attempt metrics for the rest of the process.
pub fn enable() {
    let inner = METRICS.get_or_init(MetricsInner::new);
    inner.enabled.store(true, Ordering::Relaxed);
}

/// Whether [`enable`] has been called.
pub fn is_enabled() -> bool {
    METRICS
        .get()
        .is_some_and(|inner| inner.enabled.load(Ordering::Relaxed))
}

/// Record one provider attempt; `failure` is `None` on success.
pub fn record_attempt(provider: ProviderKind, duration: Duration, failure: Option<&ProviderError>) {
    if let Some(inner) = METRICS.get() {
        if inner.enabled.load(Ordering::Relaxed) {
            inner.record(provider, duration, failure);
        }
    }
}

/// Current totals, or `None` when metrics are disabled.
pub fn snapshot() -> Option<Snapshot> {
    if !is_enabled() {
        return None;
    }
    METRICS.get().map(MetricsInner::snapshot)
}

struct MetricsInner {
    enabled: AtomicBool,
    state: Mutex<MetricsState>,
}

impl MetricsInner {
    fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            state: Mutex::new(MetricsState {
                started: Instant::now(),
                per_provider: BTreeMap::new(),
            }),
        }
    }

    fn record(&self, provider: ProviderKind, duration: Duration, failure: Option<&ProviderError>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = state.per_provider.entry(provider.label()).or_default();
        match failure {
            None => {
                entry.successes += 1;
                entry.success_duration += duration;
            }
            Some(err) => {
                entry.failures += 1;
                if matches!(err, ProviderError::Timeout(_)) {
                    entry.timeouts += 1;
                }
                entry.last_error = Some(err.to_string());
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let providers: Vec<ProviderSnapshot> = state
            .per_provider
            .iter()
            .map(|(provider, counters)| ProviderSnapshot {
                provider: (*provider).to_string(),
                successes: counters.successes,
                failures: counters.failures,
                timeouts: counters.timeouts,
                avg_latency_ms: counters.avg_latency_ms(),
                last_error: counters.last_error.clone(),
            })
            .collect();

        Snapshot {
            elapsed_secs: state.started.elapsed().as_secs(),
            total_attempts: providers.iter().map(|p| p.successes + p.failures).sum(),
            successes: providers.iter().map(|p| p.successes).sum(),
            failures: providers.iter().map(|p| p.failures).sum(),
            providers,
        }
    }
}

struct MetricsState {
    started: Instant,
    per_provider: BTreeMap<&'static str, ProviderCounters>,
}

#[derive(Default)]
struct ProviderCounters {
    successes: u64,
    failures: u64,
    timeouts: u64,
    success_duration: Duration,
    last_error: Option<String>,
}

impl ProviderCounters {
    fn avg_latency_ms(&self) -> f64 {
        if self.successes == 0 {
            0.0
        } else {
            self.success_duration.as_secs_f64() * 1_000.0 / self.successes as f64
        }
    }
}

/// Aggregated attempt counters
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Seconds since metrics were enabled
    pub elapsed_secs: u64,
    /// All attempts across providers
    pub total_attempts: u64,
    /// Successful attempts
    pub successes: u64,
    /// Failed attempts, timeouts included
    pub failures: u64,
    /// Breakdown by provider, sorted by label
    pub providers: Vec<ProviderSnapshot>,
}

/// Counters for one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSnapshot {
    /// Provider label
    pub provider: String,
    /// Successful attempts
    pub successes: u64,
    /// Failed attempts
    pub failures: u64,
    /// Failed attempts that hit the time budget
    pub timeouts: u64,
    /// Mean latency of successful attempts
    pub avg_latency_ms: f64,
    /// Most recent failure message
    pub last_error: Option<String>,
}

/// Emit the snapshot through `tracing`.
pub fn log_snapshot(snapshot: &Snapshot) {
    info!(
        target: "qrcard::metrics",
        elapsed_secs = snapshot.elapsed_secs,
        total_attempts = snapshot.total_attempts,
        success_count = snapshot.successes,
        failure_count = snapshot.failures,
        "Provider metrics"
    );

    if !snapshot.providers.is_empty() {
        let breakdown = format_breakdown(&snapshot.providers);
        info!(target: "qrcard::metrics", breakdown, "Per-provider metrics");
    }
}

fn format_breakdown(entries: &[ProviderSnapshot]) -> String {
    entries
        .iter()
        .map(|entry| {
            if entry.failures > 0 {
                format!(
                    "{}: {} ok / {} err (avg {:.1} ms)",
                    entry.provider, entry.successes, entry.failures, entry.avg_latency_ms
                )
            } else {
                format!(
                    "{}: {} ok (avg {:.1} ms)",
                    entry.provider, entry.successes, entry.avg_latency_ms
                )
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format the snapshot for output.
pub fn render(snapshot: &Snapshot, format: MetricsFormat) -> Result<String> {
    match format {
        MetricsFormat::Json => Ok(serde_json::to_string_pretty(snapshot)?),
        MetricsFormat::Prometheus => Ok(render_prometheus(snapshot)),
    }
}

fn render_prometheus(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    let _ = writeln!(
        &mut output,
        "# HELP qrcard_attempts_total Provider attempts by outcome"
    );
    let _ = writeln!(&mut output, "# TYPE qrcard_attempts_total counter");
    for entry in &snapshot.providers {
        let label = escape_label(&entry.provider);
        let _ = writeln!(
            &mut output,
            "qrcard_attempts_total{{provider=\"{}\",result=\"success\"}} {}",
            label, entry.successes
        );
        let _ = writeln!(
            &mut output,
            "qrcard_attempts_total{{provider=\"{}\",result=\"failure\"}} {}",
            label, entry.failures
        );
    }

    let _ = writeln!(
        &mut output,
        "# HELP qrcard_attempt_timeouts_total Attempts abandoned after the time budget"
    );
    let _ = writeln!(&mut output, "# TYPE qrcard_attempt_timeouts_total counter");
    for entry in &snapshot.providers {
        let _ = writeln!(
            &mut output,
            "qrcard_attempt_timeouts_total{{provider=\"{}\"}} {}",
            escape_label(&entry.provider),
            entry.timeouts
        );
    }

    let _ = writeln!(
        &mut output,
        "# HELP qrcard_attempt_latency_avg_seconds Mean latency of successful attempts"
    );
    let _ = writeln!(
        &mut output,
        "# TYPE qrcard_attempt_latency_avg_seconds gauge"
    );
    for entry in &snapshot.providers {
        let _ = writeln!(
            &mut output,
            "qrcard_attempt_latency_avg_seconds{{provider=\"{}\"}} {:.6}",
            escape_label(&entry.provider),
            entry.avg_latency_ms / 1_000.0
        );
    }

    output
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}
