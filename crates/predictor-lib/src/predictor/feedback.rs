//! Counterfactual feedback: the smallest single-feature change that lifts
//! the prediction to the decision threshold
//!
//! For each actionable feature the linear model is inverted directly:
//! `needed = logit(target) - score`, converted back to raw units through the
//! feature's scale and weight. Suggestions never leave the feature's valid
//! range; when the range does not allow reaching the target the suggestion
//! is infeasible.

use super::inference::{logit, sigmoid, ScoredInput};
use crate::classifier::ClassifierState;
use crate::config::DEFAULT_COMFORT_MARGIN;
use crate::models::{Direction, Feature, FeedbackSuggestion, Priority};
use std::cmp::Ordering;

/// Upper bound for the comfort target probability
const MAX_TARGET_PROBABILITY: f64 = 0.99;

/// Gains closer than this are ranked as equal
const GAIN_RESOLUTION: f64 = 1e-9;

/// Weights below this are treated as non-actionable
const MIN_WEIGHT: f64 = 1e-12;

/// Generates ranked feedback suggestions
#[derive(Debug, Clone)]
pub struct FeedbackGenerator {
    comfort_margin: f64,
    include_infeasible: bool,
}

impl Default for FeedbackGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_COMFORT_MARGIN, false)
    }
}

struct Candidate {
    suggestion: FeedbackSuggestion,
    effort: f64,
    order: usize,
}

impl FeedbackGenerator {
    pub fn new(comfort_margin: f64, include_infeasible: bool) -> Self {
        Self {
            comfort_margin: comfort_margin.max(0.0),
            include_infeasible,
        }
    }

    /// Probability the suggestions aim for, or `None` when no feedback is due
    pub fn target_probability(&self, probability: f64, threshold: f64) -> Option<f64> {
        if probability < threshold {
            return Some(threshold);
        }
        if probability >= threshold + self.comfort_margin {
            return None;
        }
        let target = (threshold + self.comfort_margin).min(MAX_TARGET_PROBABILITY);
        (probability < target).then_some(target)
    }

    /// Ranked suggestions for one scored input
    pub fn suggest(
        &self,
        state: &ClassifierState,
        scored: &ScoredInput,
        threshold: f64,
    ) -> Vec<FeedbackSuggestion> {
        let probability = scored.probability();
        let Some(target) = self.target_probability(probability, threshold) else {
            return Vec::new();
        };
        let needed = logit(target) - scored.score;

        let mut candidates: Vec<Candidate> = scored
            .terms
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.imputed)
            .filter_map(|(order, t)| {
                let term = state.term(t.feature)?;
                if term.weight.abs() < MIN_WEIGHT {
                    return None;
                }
                let raw_delta = term.raw_delta_for_score(needed);
                let (suggested, feasible) = bounded_value(t.feature, t.value, raw_delta);

                let change = suggested - t.value;
                // a clamped suggestion must still move in the improving direction
                if change == 0.0 || change.signum() != raw_delta.signum() {
                    return None;
                }

                let estimated = sigmoid(scored.score + change * term.score_per_unit());
                Some(Candidate {
                    suggestion: FeedbackSuggestion {
                        feature: t.feature,
                        current_value: t.value,
                        suggested_value: suggested,
                        change,
                        direction: if change > 0.0 {
                            Direction::Increase
                        } else {
                            Direction::Decrease
                        },
                        estimated_probability: estimated,
                        estimated_probability_gain: estimated - probability,
                        priority: Priority::Low,
                        feasible,
                    },
                    effort: change.abs() / t.feature.range_width(),
                    order,
                })
            })
            .filter(|c| c.suggestion.feasible || self.include_infeasible)
            .collect();

        candidates.sort_by(compare_candidates);

        let n = candidates.len();
        candidates
            .into_iter()
            .enumerate()
            .map(|(rank, c)| FeedbackSuggestion {
                priority: priority_for_rank(rank, n),
                ..c.suggestion
            })
            .collect()
    }
}

/// Apply `delta` within the feature's range. Returns the value and whether
/// the full delta fits.
fn bounded_value(feature: Feature, current: f64, delta: f64) -> (f64, bool) {
    let (min, max) = feature.range();
    let raw = current + delta;
    if delta >= 0.0 {
        let raised = raw.max(min);
        if raised <= max {
            (raised, true)
        } else {
            (max, false)
        }
    } else {
        let lowered = raw.min(max);
        if lowered >= min {
            (lowered, true)
        } else {
            (min, false)
        }
    }
}

/// Gain descending, then relative effort ascending, then model feature order
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    let gain_key = |c: &Candidate| (c.suggestion.estimated_probability_gain / GAIN_RESOLUTION).round() as i64;
    gain_key(b)
        .cmp(&gain_key(a))
        .then_with(|| a.effort.total_cmp(&b.effort))
        .then_with(|| a.order.cmp(&b.order))
}

/// Rank-based tiers: the best suggestion is high, the next half of the
/// remainder (rounded up) medium, the rest low
pub fn priority_for_rank(rank: usize, total: usize) -> Priority {
    if rank == 0 {
        Priority::High
    } else if rank <= total / 2 {
        Priority::Medium
    } else {
        Priority::Low
    }
}
