//! Per-request explanation of the linear score

use super::inference::ScoredInput;
use crate::classifier::ClassifierState;
use crate::models::{Effect, Explanation, FeatureContribution};

/// Rank contributions by magnitude and keep the top `top_n`
pub fn explain(state: &ClassifierState, scored: &ScoredInput, top_n: usize) -> Explanation {
    let mut contributions: Vec<FeatureContribution> = scored
        .terms
        .iter()
        .map(|t| FeatureContribution {
            feature: t.feature,
            value: t.value,
            normalized_value: t.normalized,
            contribution: t.contribution,
            effect: if t.contribution >= 0.0 {
                Effect::Increase
            } else {
                Effect::Decrease
            },
        })
        .collect();

    // stable sort keeps model feature order among equal magnitudes
    contributions.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
    contributions.truncate(top_n);

    Explanation {
        contributions,
        feature_importances: state.feature_importances().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::fixtures::reference_state;
    use crate::models::{Feature, FeatureVector};
    use crate::predictor::inference::score;

    #[test]
    fn test_contributions_ranked_by_magnitude() {
        let state = reference_state();
        let v = FeatureVector {
            attendance: 65.0,
            marks: 55.0,
            internal_score: 12.0,
            final_exam_score: None,
        };
        let explanation = explain(&state, &score(&state, &v), 3);

        let features: Vec<Feature> = explanation.contributions.iter().map(|c| c.feature).collect();
        // |-0.9| internal, |-0.8| marks, |-0.667| attendance
        assert_eq!(
            features,
            vec![Feature::InternalScore, Feature::Marks, Feature::Attendance]
        );
        assert!(explanation
            .contributions
            .iter()
            .all(|c| c.effect == Effect::Decrease));
    }

    #[test]
    fn test_top_n_truncates() {
        let state = reference_state();
        let v = FeatureVector {
            attendance: 90.0,
            marks: 80.0,
            internal_score: 25.0,
            final_exam_score: None,
        };
        let explanation = explain(&state, &score(&state, &v), 1);
        assert_eq!(explanation.contributions.len(), 1);
        assert_eq!(explanation.contributions[0].effect, Effect::Increase);
        assert_eq!(explanation.feature_importances.len(), 3);
    }

    #[test]
    fn test_importances_independent_of_input() {
        let state = reference_state();
        let a = FeatureVector { attendance: 10.0, marks: 10.0, internal_score: 1.0, final_exam_score: None };
        let b = FeatureVector { attendance: 99.0, marks: 99.0, internal_score: 29.0, final_exam_score: None };
        assert_eq!(
            explain(&state, &score(&state, &a), 3).feature_importances,
            explain(&state, &score(&state, &b), 3).feature_importances
        );
    }
}
