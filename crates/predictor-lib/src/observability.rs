//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction counts, model reloads, active threshold)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_counter, Gauge, GaugeVec,
    Histogram, IntCounter,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.000_01, 0.000_05, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions: IntCounter,
    prediction_errors: IntCounter,
    suspicious_inputs: IntCounter,
    feedback_suggestions: IntCounter,
    model_reloads: IntCounter,
    model_reload_failures: IntCounter,
    model_version_info: GaugeVec,
    decision_threshold: Gauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "student_predictor_prediction_latency_seconds",
                "Time spent validating, scoring, explaining and generating feedback",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions: register_int_counter!(
                "student_predictor_predictions_total",
                "Total number of successful predictions"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter!(
                "student_predictor_prediction_errors_total",
                "Total number of failed prediction requests"
            )
            .expect("Failed to register prediction_errors_total"),

            suspicious_inputs: register_int_counter!(
                "student_predictor_suspicious_inputs_total",
                "Total number of predictions made on suspicious input"
            )
            .expect("Failed to register suspicious_inputs_total"),

            feedback_suggestions: register_int_counter!(
                "student_predictor_feedback_suggestions_total",
                "Total number of feedback suggestions returned"
            )
            .expect("Failed to register feedback_suggestions_total"),

            model_reloads: register_int_counter!(
                "student_predictor_model_reloads_total",
                "Total number of successful classifier loads"
            )
            .expect("Failed to register model_reloads_total"),

            model_reload_failures: register_int_counter!(
                "student_predictor_model_reload_failures_total",
                "Total number of failed classifier loads"
            )
            .expect("Failed to register model_reload_failures_total"),

            model_version_info: register_gauge_vec!(
                "student_predictor_model_version_info",
                "Information about the currently loaded classifier",
                &["version"]
            )
            .expect("Failed to register model_version_info"),

            decision_threshold: register_gauge!(
                "student_predictor_decision_threshold",
                "Active decision threshold"
            )
            .expect("Failed to register decision_threshold"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn inc_suspicious_inputs(&self) {
        self.inner().suspicious_inputs.inc();
    }

    pub fn add_feedback_suggestions(&self, count: u64) {
        self.inner().feedback_suggestions.inc_by(count);
    }

    pub fn inc_model_reloads(&self) {
        self.inner().model_reloads.inc();
    }

    pub fn inc_model_reload_failures(&self) {
        self.inner().model_reload_failures.inc();
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str) {
        // Reset previous version
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }

    pub fn set_threshold(&self, threshold: f64) {
        self.inner().decision_threshold.set(threshold);
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions,
/// model loads and threshold changes.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a prediction
    pub fn log_prediction(
        &self,
        model_version: &str,
        probability: f64,
        predicted_label: u8,
        threshold: f64,
        suspicious: bool,
        feedback_count: usize,
    ) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            model_version = %model_version,
            probability = probability,
            predicted_label = predicted_label,
            threshold = threshold,
            suspicious_input = suspicious,
            feedback_count = feedback_count,
            "Generated pass/fail prediction"
        );
    }

    /// Log input flagged by soft validation
    pub fn log_suspicious_input(&self, reasons: &[String]) {
        warn!(
            event = "suspicious_input",
            instance = %self.instance,
            reasons = ?reasons,
            "Prediction made on suspicious input"
        );
    }

    pub fn log_startup(&self, version: &str, model_version: Option<&str>) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            model_version = ?model_version,
            "Prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Prediction service shutting down"
        );
    }

    pub fn log_model_loaded(&self, version: &str, checksum: &str, threshold: f64) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model_version = %version,
            checksum = %checksum,
            threshold = threshold,
            "Classifier loaded"
        );
    }

    pub fn log_model_load_failed(&self, error: &str) {
        warn!(
            event = "model_load_failed",
            instance = %self.instance,
            error = %error,
            "Classifier load failed, keeping previous model"
        );
    }

    pub fn log_threshold_update(&self, requested: f64, effective: f64, source: &str) {
        info!(
            event = "threshold_updated",
            instance = %self.instance,
            requested = requested,
            effective = effective,
            source = %source,
            "Decision threshold updated"
        );
    }
}
