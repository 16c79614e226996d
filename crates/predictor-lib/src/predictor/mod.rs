//! Prediction & feedback engine
//!
//! validation -> snapshot of the active classifier -> inference ->
//! explanation -> feedback. Every step is a pure function of the request
//! and the immutable classifier snapshot taken at the start of the call.

mod explain;
mod feedback;
mod inference;
mod validation;

pub use explain::explain;
pub use feedback::{priority_for_rank, FeedbackGenerator};
pub use inference::{logit, score, sigmoid, ScoredInput, TermValue};
pub use validation::{InputValidator, ValidatedInput};

use crate::classifier::{is_valid_threshold, ModelStore};
use crate::config::EngineConfig;
use crate::error::{PredictorError, PredictorResult};
use crate::models::{
    BatchItem, BatchPrediction, FeatureInput, ModelExplanation, PredictionResult, ThresholdSource,
};
use crate::observability::EngineMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Engine wrapping the active classifier
pub struct PredictionEngine {
    store: Arc<ModelStore>,
    validator: InputValidator,
    feedback: FeedbackGenerator,
    explain_top_n: usize,
    metrics: EngineMetrics,
    prediction_count: AtomicU64,
    suspicious_count: AtomicU64,
}

impl PredictionEngine {
    pub fn new(config: &EngineConfig, store: Arc<ModelStore>) -> Self {
        Self {
            store,
            validator: InputValidator::new(),
            feedback: FeedbackGenerator::new(config.comfort_margin, config.include_infeasible),
            explain_top_n: config.explain_top_n,
            metrics: EngineMetrics::new(),
            prediction_count: AtomicU64::new(0),
            suspicious_count: AtomicU64::new(0),
        }
    }

    /// Open the store described by `config` and build an engine on it
    pub fn from_config(config: &EngineConfig) -> Self {
        let store = Arc::new(ModelStore::open(config));
        Self::new(config, store)
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    /// Predict pass/fail for one input.
    ///
    /// `threshold_override` replaces the configured decision threshold for
    /// this call only.
    pub fn predict(
        &self,
        input: &FeatureInput,
        threshold_override: Option<f64>,
    ) -> PredictorResult<PredictionResult> {
        let start = Instant::now();
        let result = self.run(input, threshold_override);
        let elapsed = start.elapsed();

        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
        match &result {
            Ok(prediction) => {
                self.prediction_count.fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_predictions();
                if prediction.suspicious_input {
                    self.suspicious_count.fetch_add(1, Ordering::Relaxed);
                    self.metrics.inc_suspicious_inputs();
                }
                self.metrics.add_feedback_suggestions(prediction.feedback.len() as u64);
                debug!(
                    elapsed_us = elapsed.as_micros() as u64,
                    probability = prediction.probability,
                    "Prediction completed"
                );
            }
            Err(e) => {
                self.metrics.inc_prediction_errors();
                debug!(error = %e, "Prediction failed");
            }
        }
        result
    }

    fn run(
        &self,
        input: &FeatureInput,
        threshold_override: Option<f64>,
    ) -> PredictorResult<PredictionResult> {
        let validated = self.validator.validate(input)?;
        check_override(threshold_override)?;

        let state = self.store.snapshot()?;
        let (threshold, threshold_source) = match threshold_override {
            Some(t) => (t, ThresholdSource::Request),
            None => (state.threshold(), state.threshold_source()),
        };

        let scored = score(&state, &validated.features);
        let probability = scored.probability();
        let explanation = explain(&state, &scored, self.explain_top_n);
        let feedback = self.feedback.suggest(&state, &scored, threshold);

        Ok(PredictionResult {
            predicted_label: u8::from(probability >= threshold),
            probability,
            threshold_used: threshold,
            threshold_source,
            model_version: state.version().to_string(),
            suspicious_input: validated.is_suspicious(),
            suspicious_reasons: validated.suspicious_reasons,
            explanation,
            feedback,
        })
    }

    /// Predict a batch; a bad record yields an error entry, not a failed batch
    pub fn predict_batch(
        &self,
        items: &[BatchItem],
        threshold_override: Option<f64>,
    ) -> PredictorResult<Vec<BatchPrediction>> {
        check_override(threshold_override)?;
        if !self.store.is_loaded() {
            return Err(PredictorError::ModelUnavailable);
        }

        Ok(items
            .iter()
            .map(|item| {
                let outcome = self.predict(&item.features, threshold_override);
                let (result, error) = match outcome {
                    Ok(r) => (Some(r), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                BatchPrediction {
                    student_id: item.student_id,
                    course_id: item.course_id,
                    result,
                    error,
                }
            })
            .collect())
    }

    /// Model-level explanation: feature importances of the active classifier
    pub fn explain_model(&self) -> PredictorResult<ModelExplanation> {
        let state = self.store.snapshot()?;
        Ok(ModelExplanation {
            model_version: state.version().to_string(),
            threshold: state.threshold(),
            threshold_source: state.threshold_source(),
            feature_importances: state.feature_importances().to_vec(),
        })
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            total_predictions: self.prediction_count.load(Ordering::Relaxed),
            suspicious_predictions: self.suspicious_count.load(Ordering::Relaxed),
        }
    }
}

fn check_override(threshold: Option<f64>) -> PredictorResult<()> {
    match threshold {
        Some(t) if !is_valid_threshold(t) => Err(PredictorError::Validation(format!(
            "Threshold must be between 0 and 1, got {}",
            t
        ))),
        _ => Ok(()),
    }
}

/// Engine statistics
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub total_predictions: u64,
    pub suspicious_predictions: u64,
}
