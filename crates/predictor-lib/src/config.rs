//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of contributions reported per prediction
pub const DEFAULT_EXPLAIN_TOP_N: usize = 3;

/// Probability margin above the threshold under which feedback is still offered
pub const DEFAULT_COMFORT_MARGIN: f64 = 0.05;

/// Configuration passed to the engine at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Location of the classifier artifact
    pub model_path: PathBuf,
    /// Location of the training metadata
    pub metadata_path: PathBuf,
    /// Decision cutoff overriding the metadata thresholds
    pub threshold: Option<f64>,
    /// Number of feature contributions in each explanation
    pub explain_top_n: usize,
    /// Feedback is generated while probability < threshold + margin
    pub comfort_margin: f64,
    /// Return infeasible suggestions flagged instead of dropping them
    pub include_infeasible: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model.json"),
            metadata_path: PathBuf::from("models/metadata.json"),
            threshold: None,
            explain_top_n: DEFAULT_EXPLAIN_TOP_N,
            comfort_margin: DEFAULT_COMFORT_MARGIN,
            include_infeasible: false,
        }
    }
}

impl EngineConfig {
    pub fn with_paths(model_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            metadata_path: metadata_path.into(),
            ..Default::default()
        }
    }
}
