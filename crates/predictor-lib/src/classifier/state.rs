//! Immutable classifier snapshot

use super::artifact::{ModelArtifact, ModelMetadata};
use super::threshold::{resolve_threshold, DEFAULT_THRESHOLD};
use crate::error::{PredictorError, PredictorResult};
use crate::models::{Feature, FeatureImportance, ThresholdSource};
use std::collections::HashSet;

/// Scales below this are treated as a constant feature (scale 1)
const MIN_SCALE: f64 = 1e-12;

/// A fitted model term for one feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTerm {
    pub feature: Feature,
    pub weight: f64,
    pub mean: f64,
    pub scale: f64,
}

impl FeatureTerm {
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    /// Raw-feature change needed for a given change of the linear score
    pub fn raw_delta_for_score(&self, score_delta: f64) -> f64 {
        score_delta * self.scale / self.weight
    }

    /// Change of the linear score per raw unit of this feature
    pub fn score_per_unit(&self) -> f64 {
        self.weight / self.scale
    }
}

/// Loaded classifier. Never mutated: every change builds a new state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierState {
    version: String,
    terms: Vec<FeatureTerm>,
    bias: f64,
    threshold: f64,
    threshold_source: ThresholdSource,
    feature_importances: Vec<FeatureImportance>,
    checksum: String,
    loaded_at: i64,
}

impl ClassifierState {
    /// Build a state from an artifact, its metadata and the configured threshold
    pub fn from_artifact(
        artifact: ModelArtifact,
        metadata: Option<&ModelMetadata>,
        checksum: String,
        configured_threshold: Option<f64>,
    ) -> PredictorResult<Self> {
        if let Some(expected) = metadata.and_then(ModelMetadata::checksum) {
            if !expected.eq_ignore_ascii_case(&checksum) {
                return Err(PredictorError::InvalidArtifact(format!(
                    "Checksum mismatch: expected {}, got {}",
                    expected, checksum
                )));
            }
        }

        if artifact.features.is_empty() {
            return Err(PredictorError::InvalidArtifact(
                "Artifact has no features".to_string(),
            ));
        }
        if !artifact.bias.is_finite() {
            return Err(PredictorError::InvalidArtifact(
                "Bias is not a finite number".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut terms = Vec::with_capacity(artifact.features.len());
        for f in &artifact.features {
            let feature = Feature::from_name(&f.name).ok_or_else(|| {
                PredictorError::InvalidArtifact(format!("Unknown feature '{}'", f.name))
            })?;
            if !seen.insert(feature) {
                return Err(PredictorError::InvalidArtifact(format!(
                    "Duplicate feature '{}'",
                    f.name
                )));
            }
            if !(f.weight.is_finite() && f.mean.is_finite() && f.scale.is_finite()) {
                return Err(PredictorError::InvalidArtifact(format!(
                    "Non-finite parameters for feature '{}'",
                    f.name
                )));
            }
            let scale = if f.scale.abs() < MIN_SCALE { 1.0 } else { f.scale };
            terms.push(FeatureTerm {
                feature,
                weight: f.weight,
                mean: f.mean,
                scale,
            });
        }

        let (threshold, threshold_source) = resolve_threshold(configured_threshold, metadata);

        Ok(Self::assemble(
            artifact.version,
            terms,
            artifact.bias,
            threshold,
            threshold_source,
            checksum,
        ))
    }

    /// Build a state directly from fitted terms, e.g. after an in-process
    /// training run.
    ///
    /// The state starts on the default threshold; `ModelStore::install`
    /// resolves the effective one from configuration and metadata.
    pub fn new(version: impl Into<String>, terms: Vec<FeatureTerm>, bias: f64) -> Self {
        Self::assemble(
            version.into(),
            terms,
            bias,
            DEFAULT_THRESHOLD,
            ThresholdSource::Default,
            String::new(),
        )
    }

    fn assemble(
        version: String,
        terms: Vec<FeatureTerm>,
        bias: f64,
        threshold: f64,
        threshold_source: ThresholdSource,
        checksum: String,
    ) -> Self {
        let mut feature_importances: Vec<FeatureImportance> = terms
            .iter()
            .map(|t| FeatureImportance {
                feature: t.feature,
                importance: t.weight.abs(),
            })
            .collect();
        feature_importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        Self {
            version,
            terms,
            bias,
            threshold,
            threshold_source,
            feature_importances,
            checksum,
            loaded_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Copy of this state with a different decision threshold.
    /// Callers pass an already resolved, valid threshold.
    pub(crate) fn retarget(&self, threshold: f64, source: ThresholdSource) -> Self {
        let mut next = self.clone();
        next.threshold = threshold;
        next.threshold_source = source;
        next
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn terms(&self) -> &[FeatureTerm] {
        &self.terms
    }

    pub fn term(&self, feature: Feature) -> Option<&FeatureTerm> {
        self.terms.iter().find(|t| t.feature == feature)
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn threshold_source(&self) -> ThresholdSource {
        self.threshold_source
    }

    /// Absolute weights, largest first
    pub fn feature_importances(&self) -> &[FeatureImportance] {
        &self.feature_importances
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn loaded_at(&self) -> i64 {
        self.loaded_at
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::artifact::ArtifactFeature;

    fn artifact() -> ModelArtifact {
        ModelArtifact {
            version: "v2".to_string(),
            features: vec![
                ArtifactFeature { name: "attendance".into(), weight: -0.3, mean: 75.0, scale: 12.0 },
                ArtifactFeature { name: "marks".into(), weight: 1.2, mean: 65.0, scale: 0.0 },
            ],
            bias: 0.1,
        }
    }

    #[test]
    fn test_importances_sorted_by_absolute_weight() {
        let state = ClassifierState::from_artifact(artifact(), None, "abc".into(), None).unwrap();
        let importances = state.feature_importances();
        assert_eq!(importances[0].feature, Feature::Marks);
        assert_eq!(importances[1].feature, Feature::Attendance);
        assert!((importances[1].importance - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_zero_scale_treated_as_one() {
        let state = ClassifierState::from_artifact(artifact(), None, "abc".into(), None).unwrap();
        assert_eq!(state.term(Feature::Marks).unwrap().scale, 1.0);
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let mut a = artifact();
        a.features[0].name = "height".into();
        assert!(matches!(
            ClassifierState::from_artifact(a, None, "abc".into(), None),
            Err(PredictorError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let mut a = artifact();
        a.features[1].name = "attendance".into();
        assert!(ClassifierState::from_artifact(a, None, "abc".into(), None).is_err());
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let metadata = ModelMetadata::new().with(ModelMetadata::CHECKSUM, "deadbeef");
        let result = ClassifierState::from_artifact(artifact(), Some(&metadata), "abc".into(), None);
        assert!(matches!(result, Err(PredictorError::InvalidArtifact(_))));
    }

    #[test]
    fn test_threshold_resolved_from_metadata() {
        let metadata = ModelMetadata::new()
            .with(ModelMetadata::RECOMMENDED_THRESHOLD, 0.55)
            .with(ModelMetadata::CHECKSUM, "ABC");
        let state =
            ClassifierState::from_artifact(artifact(), Some(&metadata), "abc".into(), None).unwrap();
        assert_eq!(state.threshold(), 0.55);
        assert_eq!(state.threshold_source(), ThresholdSource::MetadataRecommended);
    }

    #[test]
    fn test_new_state_reports_default_threshold() {
        let state = fixtures::reference_state();
        assert_eq!(state.threshold(), DEFAULT_THRESHOLD);
        assert_eq!(state.threshold_source(), ThresholdSource::Default);
        assert!(state.checksum().is_empty());
    }

    #[test]
    fn test_retarget_leaves_original_untouched() {
        let state = fixtures::reference_state();
        let next = state.retarget(0.7, ThresholdSource::MetadataUser);
        assert_eq!(state.threshold(), 0.6);
        assert_eq!(next.threshold(), 0.7);
        assert_eq!(next.threshold_source(), ThresholdSource::MetadataUser);
        assert_eq!(next.terms(), state.terms());
    }

    #[test]
    fn test_raw_delta_inverts_normalization() {
        let term = FeatureTerm { feature: Feature::Marks, weight: 1.2, mean: 65.0, scale: 15.0 };
        let delta = term.raw_delta_for_score(2.4);
        assert!((delta - 30.0).abs() < 1e-12);
        assert!((term.score_per_unit() * delta - 2.4).abs() < 1e-12);
    }
}
