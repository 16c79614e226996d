//! Logistic inference over standardized features

use crate::classifier::ClassifierState;
use crate::models::{Feature, FeatureVector};

/// Probabilities are kept inside this band when converting back to logits
const PROBABILITY_EPSILON: f64 = 1e-12;

/// Numerically stable logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`sigmoid`]
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
    (p / (1.0 - p)).ln()
}

/// One model term evaluated against an input
#[derive(Debug, Clone, PartialEq)]
pub struct TermValue {
    pub feature: Feature,
    /// Raw value; the training mean when imputed
    pub value: f64,
    pub normalized: f64,
    pub contribution: f64,
    pub imputed: bool,
}

/// Linear score of an input under one classifier snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredInput {
    pub terms: Vec<TermValue>,
    pub score: f64,
}

impl ScoredInput {
    pub fn probability(&self) -> f64 {
        sigmoid(self.score)
    }

    pub fn term(&self, feature: Feature) -> Option<&TermValue> {
        self.terms.iter().find(|t| t.feature == feature)
    }
}

/// Evaluate the linear score; absent optional features are imputed with the mean
pub fn score(state: &ClassifierState, features: &FeatureVector) -> ScoredInput {
    let mut total = state.bias();
    let terms = state
        .terms()
        .iter()
        .map(|term| {
            let (value, imputed) = match features.get(term.feature) {
                Some(v) => (v, false),
                None => (term.mean, true),
            };
            let normalized = term.normalize(value);
            let contribution = normalized * term.weight;
            total += contribution;
            TermValue {
                feature: term.feature,
                value,
                normalized,
                contribution,
                imputed,
            }
        })
        .collect();

    ScoredInput { terms, score: total }
}
