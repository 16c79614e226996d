//! Soft input validation
//!
//! Only missing required features and non-numeric values block a
//! prediction. Out-of-range and internally inconsistent values are reported
//! as suspicious so the caller can warn the end user.

use crate::error::{PredictorError, PredictorResult};
use crate::models::{Feature, FeatureInput, FeatureVector};

/// Attendance below this with marks above `HIGH_MARKS` is implausible
const LOW_ATTENDANCE: f64 = 40.0;
const HIGH_MARKS: f64 = 85.0;

/// Maximum tolerated gap (on a 0-100 scale) between related scores
const MAX_SCORE_GAP: f64 = 50.0;

/// Feature vector that passed validation, with its caveats
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    pub features: FeatureVector,
    pub suspicious_reasons: Vec<String>,
}

impl ValidatedInput {
    pub fn is_suspicious(&self) -> bool {
        !self.suspicious_reasons.is_empty()
    }
}

/// Validates raw feature payloads
#[derive(Debug, Clone, Default)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, input: &FeatureInput) -> PredictorResult<ValidatedInput> {
        let missing: Vec<&str> = Feature::REQUIRED
            .iter()
            .filter(|f| input.get(**f).is_none())
            .map(|f| f.name())
            .collect();
        if !missing.is_empty() {
            return Err(PredictorError::Validation(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )));
        }

        for feature in Feature::ALL {
            if let Some(value) = input.get(feature) {
                if !value.is_finite() {
                    return Err(PredictorError::Validation(format!(
                        "Field '{}' must be a finite number",
                        feature
                    )));
                }
            }
        }

        let features = FeatureVector {
            attendance: input.attendance.unwrap_or_default(),
            marks: input.marks.unwrap_or_default(),
            internal_score: input.internal_score.unwrap_or_default(),
            final_exam_score: input.final_exam_score,
        };

        let suspicious_reasons = self.suspicious_reasons(&features);
        Ok(ValidatedInput {
            features,
            suspicious_reasons,
        })
    }

    fn suspicious_reasons(&self, v: &FeatureVector) -> Vec<String> {
        let mut reasons = Vec::new();

        for feature in Feature::ALL {
            if let Some(value) = v.get(feature) {
                if !feature.in_range(value) {
                    let (min, max) = feature.range();
                    reasons.push(format!(
                        "{} {} is outside the expected range [{}, {}]",
                        feature, value, min, max
                    ));
                }
            }
        }

        if v.attendance < LOW_ATTENDANCE && v.marks > HIGH_MARKS {
            reasons.push(format!(
                "marks {} are unusually high for attendance {}",
                v.marks, v.attendance
            ));
        }

        let (_, internal_max) = Feature::InternalScore.range();
        let internal_pct = v.internal_score / internal_max * 100.0;
        if (internal_pct - v.marks).abs() > MAX_SCORE_GAP {
            reasons.push(format!(
                "internal_score {} is inconsistent with marks {}",
                v.internal_score, v.marks
            ));
        }

        if let Some(final_exam) = v.final_exam_score {
            if (final_exam - v.marks).abs() > MAX_SCORE_GAP {
                reasons.push(format!(
                    "final_exam_score {} is inconsistent with marks {}",
                    final_exam, v.marks
                ));
            }
        }

        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_input_not_suspicious() {
        let input = FeatureInput::new(82.0, 75.0, 20.0).with_final_exam_score(70.0);
        let validated = InputValidator::new().validate(&input).unwrap();
        assert!(!validated.is_suspicious(), "{:?}", validated.suspicious_reasons);
        assert_eq!(validated.features.final_exam_score, Some(70.0));
    }

    #[test]
    fn test_missing_marks_is_validation_error() {
        let input = FeatureInput {
            attendance: Some(80.0),
            internal_score: Some(20.0),
            ..Default::default()
        };
        let err = InputValidator::new().validate(&input).unwrap_err();
        assert!(matches!(err, PredictorError::Validation(ref m) if m.contains("marks")));
    }

    #[test]
    fn test_all_missing_fields_reported() {
        let err = InputValidator::new()
            .validate(&FeatureInput::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("attendance"));
        assert!(message.contains("marks"));
        assert!(message.contains("internal_score"));
    }

    #[test]
    fn test_missing_final_exam_score_allowed() {
        let validated = InputValidator::new()
            .validate(&FeatureInput::new(65.0, 55.0, 12.0))
            .unwrap();
        assert!(validated.features.final_exam_score.is_none());
    }

    #[test]
    fn test_non_finite_rejected() {
        let input = FeatureInput::new(f64::NAN, 60.0, 15.0);
        assert!(InputValidator::new().validate(&input).is_err());
    }

    #[test]
    fn test_out_of_range_flagged_not_rejected() {
        let input = FeatureInput::new(120.0, 70.0, 35.0);
        let validated = InputValidator::new().validate(&input).unwrap();
        assert!(validated.is_suspicious());
        assert!(validated
            .suspicious_reasons
            .iter()
            .any(|r| r.starts_with("attendance")));
        assert!(validated
            .suspicious_reasons
            .iter()
            .any(|r| r.contains("internal_score 35 is outside")));
    }

    #[test]
    fn test_high_marks_low_attendance_flagged() {
        let input = FeatureInput::new(20.0, 95.0, 28.0);
        let validated = InputValidator::new().validate(&input).unwrap();
        assert!(validated
            .suspicious_reasons
            .iter()
            .any(|r| r.contains("unusually high")));
    }

    #[test]
    fn test_inconsistent_scores_flagged() {
        let input = FeatureInput::new(80.0, 90.0, 3.0).with_final_exam_score(20.0);
        let validated = InputValidator::new().validate(&input).unwrap();
        assert_eq!(validated.suspicious_reasons.len(), 2);
    }
}
