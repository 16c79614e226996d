//! Decision threshold resolution
//!
//! Precedence: configured threshold, then the admin-set threshold stored in
//! metadata, then the threshold recommended by training, then the default.

use super::artifact::ModelMetadata;
use crate::models::ThresholdSource;
use tracing::warn;

/// Threshold used when nothing else is configured
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// A usable threshold lies strictly between 0 and 1
pub fn is_valid_threshold(threshold: f64) -> bool {
    threshold.is_finite() && threshold > 0.0 && threshold < 1.0
}

/// Resolve the effective threshold and where it came from
pub fn resolve_threshold(
    configured: Option<f64>,
    metadata: Option<&ModelMetadata>,
) -> (f64, ThresholdSource) {
    if let Some(threshold) = configured {
        if is_valid_threshold(threshold) {
            return (threshold, ThresholdSource::Config);
        }
        warn!(threshold = threshold, "Ignoring configured threshold outside (0, 1)");
    }

    if let Some(metadata) = metadata {
        if let Some(user) = metadata.user_threshold().filter(|t| is_valid_threshold(*t)) {
            return (user, ThresholdSource::MetadataUser);
        }
        if let Some(recommended) = metadata
            .recommended_threshold()
            .filter(|t| is_valid_threshold(*t))
        {
            return (recommended, ThresholdSource::MetadataRecommended);
        }
    }

    (DEFAULT_THRESHOLD, ThresholdSource::Default)
}
