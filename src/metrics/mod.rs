//! Prometheus metrics for the estimation service

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, Counter, CounterVec, HistogramVec, Opts, Registry,
};
use std::sync::Arc;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

pub struct Metrics {
    registry: Registry,

    // Estimation endpoints
    pub estimate_requests: CounterVec,

    // Remote estimators (LLM providers, text classifier)
    pub upstream_requests: CounterVec,
    pub upstream_request_duration: HistogramVec,
    pub upstream_cache_hits: CounterVec,
    pub upstream_circuit_open: CounterVec,

    // History and training
    pub tasks_recorded: Counter,
    pub csv_rows_imported: Counter,
    pub csv_rows_skipped: Counter,
    pub classifier_trainings: Counter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let estimate_requests = register_counter_vec_with_registry!(
            Opts::new("estimate_requests_total", "Estimation requests by method and outcome"),
            &["method", "status"],
            registry
        )?;

        let upstream_requests = register_counter_vec_with_registry!(
            Opts::new("upstream_requests_total", "Calls to remote estimators by outcome"),
            &["upstream", "status"],
            registry
        )?;

        let upstream_request_duration = register_histogram_vec_with_registry!(
            "upstream_request_duration_seconds",
            "Remote estimator call duration in seconds, retries included",
            &["upstream"],
            registry
        )?;

        let upstream_cache_hits = register_counter_vec_with_registry!(
            Opts::new("upstream_cache_hits_total", "Remote estimates served from cache"),
            &["upstream"],
            registry
        )?;

        let upstream_circuit_open = register_counter_vec_with_registry!(
            Opts::new("upstream_circuit_open_total", "Calls rejected by an open circuit"),
            &["upstream"],
            registry
        )?;

        let tasks_recorded = register_counter_with_registry!(
            Opts::new("tasks_recorded_total", "Tasks saved to the history"),
            registry
        )?;

        let csv_rows_imported = register_counter_with_registry!(
            Opts::new("csv_rows_imported_total", "CSV rows imported as tasks"),
            registry
        )?;

        let csv_rows_skipped = register_counter_with_registry!(
            Opts::new("csv_rows_skipped_total", "CSV data lines skipped as malformed"),
            registry
        )?;

        let classifier_trainings = register_counter_with_registry!(
            Opts::new("classifier_trainings_total", "Completed classifier trainings"),
            registry
        )?;

        Ok(Self {
            registry,
            estimate_requests,
            upstream_requests,
            upstream_request_duration,
            upstream_cache_hits,
            upstream_circuit_open,
            tasks_recorded,
            csv_rows_imported,
            csv_rows_skipped,
            classifier_trainings,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_estimate(&self, method: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.estimate_requests.with_label_values(&[method, status]).inc();
    }

    pub fn record_upstream(&self, upstream: &str, status: &str, seconds: f64) {
        self.upstream_requests.with_label_values(&[upstream, status]).inc();
        self.upstream_request_duration
            .with_label_values(&[upstream])
            .observe(seconds);
    }

    pub fn record_csv_import(&self, imported: usize, skipped: usize) {
        self.csv_rows_imported.inc_by(imported as f64);
        self.csv_rows_skipped.inc_by(skipped as f64);
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_export_includes_recorded_values() {
        let metrics = Metrics::new().unwrap();
        metrics.record_estimate("rules", true);
        metrics.record_upstream("groq", "success", 0.25);
        metrics.record_csv_import(4, 1);

        let text = metrics.export_prometheus();
        assert!(text.contains("estimate_requests_total{method=\"rules\",status=\"success\"} 1"));
        assert!(text.contains("csv_rows_skipped_total 1"));
        assert!(text.contains("upstream_request_duration_seconds_count{upstream=\"groq\"} 1"));
    }
}
