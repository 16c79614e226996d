//! Core data models for the prediction engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Student features known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Attendance,
    Marks,
    InternalScore,
    FinalExamScore,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Attendance,
        Feature::Marks,
        Feature::InternalScore,
        Feature::FinalExamScore,
    ];

    /// Features that must be present for a prediction
    pub const REQUIRED: [Feature; 3] = [Feature::Attendance, Feature::Marks, Feature::InternalScore];

    /// Wire name of the feature
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Attendance => "attendance",
            Feature::Marks => "marks",
            Feature::InternalScore => "internal_score",
            Feature::FinalExamScore => "final_exam_score",
        }
    }

    /// Inclusive valid range of the raw value
    pub fn range(&self) -> (f64, f64) {
        match self {
            Feature::Attendance => (0.0, 100.0),
            Feature::Marks => (0.0, 100.0),
            Feature::InternalScore => (0.0, 30.0),
            Feature::FinalExamScore => (0.0, 100.0),
        }
    }

    pub fn range_width(&self) -> f64 {
        let (min, max) = self.range();
        max - min
    }

    pub fn in_range(&self, value: f64) -> bool {
        let (min, max) = self.range();
        value >= min && value <= max
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw prediction request payload; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureInput {
    #[serde(default)]
    pub attendance: Option<f64>,
    #[serde(default)]
    pub marks: Option<f64>,
    #[serde(default)]
    pub internal_score: Option<f64>,
    #[serde(default)]
    pub final_exam_score: Option<f64>,
}

impl FeatureInput {
    pub fn new(attendance: f64, marks: f64, internal_score: f64) -> Self {
        Self {
            attendance: Some(attendance),
            marks: Some(marks),
            internal_score: Some(internal_score),
            final_exam_score: None,
        }
    }

    pub fn with_final_exam_score(mut self, score: f64) -> Self {
        self.final_exam_score = Some(score);
        self
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Attendance => self.attendance,
            Feature::Marks => self.marks,
            Feature::InternalScore => self.internal_score,
            Feature::FinalExamScore => self.final_exam_score,
        }
    }

    /// Copy of this input with one feature replaced
    pub fn with_value(&self, feature: Feature, value: f64) -> Self {
        let mut next = self.clone();
        match feature {
            Feature::Attendance => next.attendance = Some(value),
            Feature::Marks => next.marks = Some(value),
            Feature::InternalScore => next.internal_score = Some(value),
            Feature::FinalExamScore => next.final_exam_score = Some(value),
        }
        next
    }

    /// True when every required feature is present
    pub fn is_complete(&self) -> bool {
        Feature::REQUIRED.iter().all(|f| self.get(*f).is_some())
    }
}

/// Validated feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub attendance: f64,
    pub marks: f64,
    pub internal_score: f64,
    pub final_exam_score: Option<f64>,
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Attendance => Some(self.attendance),
            Feature::Marks => Some(self.marks),
            Feature::InternalScore => Some(self.internal_score),
            Feature::FinalExamScore => self.final_exam_score,
        }
    }

    pub fn with_value(&self, feature: Feature, value: f64) -> Self {
        let mut next = *self;
        match feature {
            Feature::Attendance => next.attendance = value,
            Feature::Marks => next.marks = value,
            Feature::InternalScore => next.internal_score = value,
            Feature::FinalExamScore => next.final_exam_score = Some(value),
        }
        next
    }
}

impl From<FeatureVector> for FeatureInput {
    fn from(v: FeatureVector) -> Self {
        Self {
            attendance: Some(v.attendance),
            marks: Some(v.marks),
            internal_score: Some(v.internal_score),
            final_exam_score: v.final_exam_score,
        }
    }
}

/// Where the active decision threshold came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdSource {
    #[serde(rename = "config")]
    Config,
    #[serde(rename = "metadata:user")]
    MetadataUser,
    #[serde(rename = "metadata:recommended")]
    MetadataRecommended,
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "request")]
    Request,
}

impl ThresholdSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdSource::Config => "config",
            ThresholdSource::MetadataUser => "metadata:user",
            ThresholdSource::MetadataRecommended => "metadata:recommended",
            ThresholdSource::Default => "default",
            ThresholdSource::Request => "request",
        }
    }
}

impl fmt::Display for ThresholdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction in which a contribution moves the probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Increase,
    Decrease,
}

/// Contribution of one feature to the linear score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: Feature,
    pub value: f64,
    pub normalized_value: f64,
    pub contribution: f64,
    pub effect: Effect,
}

/// Model-level importance of a feature (absolute weight)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: Feature,
    pub importance: f64,
}

/// Explanation attached to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub contributions: Vec<FeatureContribution>,
    pub feature_importances: Vec<FeatureImportance>,
}

/// Requested direction of change for a feedback suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

/// Priority tier of a feedback suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A single-feature change estimated to lift the prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSuggestion {
    pub feature: Feature,
    pub current_value: f64,
    pub suggested_value: f64,
    pub change: f64,
    pub direction: Direction,
    pub estimated_probability: f64,
    pub estimated_probability_gain: f64,
    pub priority: Priority,
    pub feasible: bool,
}

/// Result of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_label: u8,
    pub probability: f64,
    pub threshold_used: f64,
    pub threshold_source: ThresholdSource,
    pub model_version: String,
    pub suspicious_input: bool,
    pub suspicious_reasons: Vec<String>,
    pub explanation: Explanation,
    pub feedback: Vec<FeedbackSuggestion>,
}

impl PredictionResult {
    pub fn is_pass(&self) -> bool {
        self.predicted_label == 1
    }
}

/// Model-level explanation, independent of any request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExplanation {
    pub model_version: String,
    pub threshold: f64,
    pub threshold_source: ThresholdSource,
    pub feature_importances: Vec<FeatureImportance>,
}

/// One record of a batch prediction request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(default)]
    pub student_id: Option<i64>,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(flatten)]
    pub features: FeatureInput,
}

/// Outcome for one batch record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_ranges() {
        assert_eq!(Feature::InternalScore.range(), (0.0, 30.0));
        assert!(Feature::Marks.in_range(100.0));
        assert!(!Feature::Attendance.in_range(100.5));
        assert!(!Feature::InternalScore.in_range(-1.0));
    }

    #[test]
    fn test_feature_from_name() {
        assert_eq!(Feature::from_name("internal_score"), Some(Feature::InternalScore));
        assert_eq!(Feature::from_name("shoe_size"), None);
    }

    #[test]
    fn test_feature_input_deserializes_missing_fields() {
        let input: FeatureInput =
            serde_json::from_str(r#"{"attendance": 80, "internal_score": 20}"#).unwrap();
        assert_eq!(input.attendance, Some(80.0));
        assert_eq!(input.marks, None);
        assert!(!input.is_complete());
    }

    #[test]
    fn test_batch_item_flattens_features() {
        let item: BatchItem = serde_json::from_str(
            r#"{"student_id": 7, "course_id": 2, "attendance": 90, "marks": 80, "internal_score": 25}"#,
        )
        .unwrap();
        assert_eq!(item.student_id, Some(7));
        assert!(item.features.is_complete());
    }

    #[test]
    fn test_threshold_source_serialization() {
        let json = serde_json::to_string(&ThresholdSource::MetadataUser).unwrap();
        assert_eq!(json, "\"metadata:user\"");
        assert_eq!(ThresholdSource::Default.to_string(), "default");
    }

    #[test]
    fn test_with_value_replaces_single_feature() {
        let input = FeatureInput::new(70.0, 60.0, 15.0);
        let next = input.with_value(Feature::Marks, 75.0);
        assert_eq!(next.marks, Some(75.0));
        assert_eq!(next.attendance, Some(70.0));
    }
}
