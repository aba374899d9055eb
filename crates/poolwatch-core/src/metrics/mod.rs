//! # Metrics
//!
//! Prometheus counters and gauges for the anchor resolver and win pipeline.
//!
//! Recording goes through the `metrics` facade macros, so components record
//! without holding a handle and recording is a no-op until a recorder is
//! installed. [`MetricsCollector`] installs the Prometheus recorder once per
//! process and renders the scrape body.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `poolwatch_anchor_refresh_total` | counter | |
//! | `poolwatch_anchor_samples` | gauge | |
//! | `poolwatch_anchor_source_failures_total` | counter | `url` |
//! | `poolwatch_anchor_divergence_total` | counter | |
//! | `poolwatch_anchor_height` | gauge | |
//! | `poolwatch_win_reports_total` | counter | |
//! | `poolwatch_win_pending` | gauge | |
//! | `poolwatch_win_classified_total` | counter | `outcome` |
//! | `poolwatch_tipset_lookup_failures_total` | counter | |
//! | `poolwatch_win_reports_dropped_total` | counter | |
//! | `poolwatch_classification_faults_total` | counter | |

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Owns the process-wide Prometheus handle.
#[derive(Clone)]
pub struct MetricsCollector {
    handle: PrometheusHandle,
}

impl MetricsCollector {
    /// Installs the Prometheus recorder on first use and returns a collector.
    ///
    /// Later calls reuse the same handle. If another global recorder is
    /// already installed, the handle still renders but stays empty.
    #[must_use]
    pub fn new() -> Self {
        let handle = PROMETHEUS_HANDLE
            .get_or_init(|| {
                let recorder = PrometheusBuilder::new().build_recorder();
                let handle = recorder.handle();
                if metrics::set_global_recorder(recorder).is_err() {
                    tracing::warn!("a global metrics recorder is already installed");
                }
                handle
            })
            .clone();

        Self { handle }
    }

    /// Renders all metrics in the Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn record_anchor_refresh(samples: usize, sources: usize) {
    counter!("poolwatch_anchor_refresh_total").increment(1);
    gauge!("poolwatch_anchor_samples").set(samples as f64);
    tracing::trace!(samples, sources, "anchor refresh recorded");
}

pub fn record_anchor_source_failure(url: &str) {
    counter!("poolwatch_anchor_source_failures_total", "url" => url.to_string()).increment(1);
}

pub fn record_anchor_divergence() {
    counter!("poolwatch_anchor_divergence_total").increment(1);
}

#[allow(clippy::cast_precision_loss)]
pub fn record_anchor_head(height: u64) {
    gauge!("poolwatch_anchor_height").set(height as f64);
}

pub fn record_win_report() {
    counter!("poolwatch_win_reports_total").increment(1);
}

#[allow(clippy::cast_precision_loss)]
pub fn record_pending(pending: usize) {
    gauge!("poolwatch_win_pending").set(pending as f64);
}

/// `outcome` is `"win"` or `"orphan"`.
pub fn record_classification(outcome: &'static str) {
    counter!("poolwatch_win_classified_total", "outcome" => outcome).increment(1);
}

pub fn record_tipset_lookup_failure() {
    counter!("poolwatch_tipset_lookup_failures_total").increment(1);
}

pub fn record_report_dropped() {
    counter!("poolwatch_win_reports_dropped_total").increment(1);
}

pub fn record_classification_fault() {
    counter!("poolwatch_classification_faults_total").increment(1);
}
