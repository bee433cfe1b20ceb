// Confidence Scorer
// Bounded confidence per candidate: base score by strategy, then exactness,
// taxonomy corroboration and (for context hits) independent phrase bonuses.

use crate::models::{Candidate, DetectionMethod, MatchExactness};
use serde::{Deserialize, Serialize};

use super::taxonomy::Taxonomy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringWeights {
    pub known_pattern_base: f64,
    pub scientific_name_base: f64,
    pub context_base: f64,
    pub exact_bonus: f64,
    pub normalized_penalty: f64,
    pub resolved_bonus: f64,
    pub unresolved_penalty: f64,
    /// Added per contextual phrase beyond the first
    pub context_signal_bonus: f64,
    pub context_signal_cap: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            known_pattern_base: 0.90,
            scientific_name_base: 0.75,
            context_base: 0.55,
            exact_bonus: 0.05,
            normalized_penalty: 0.05,
            resolved_bonus: 0.05,
            unresolved_penalty: 0.10,
            context_signal_bonus: 0.10,
            context_signal_cap: 0.20,
        }
    }
}

impl ScoringWeights {
    pub fn base_score(&self, method: DetectionMethod) -> f64 {
        match method {
            DetectionMethod::KnownPattern => self.known_pattern_base,
            DetectionMethod::ScientificName => self.scientific_name_base,
            DetectionMethod::Context => self.context_base,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
}

impl ConfidenceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Deterministic score in [0, 1]
    pub fn score(&self, candidate: &Candidate<'_>, taxonomy: &Taxonomy) -> f64 {
        let w = &self.weights;
        let mut score = candidate.base_score;

        score += match candidate.exactness {
            MatchExactness::Exact => w.exact_bonus,
            MatchExactness::Normalized => -w.normalized_penalty,
        };

        score += if taxonomy.resolved {
            w.resolved_bonus
        } else {
            -w.unresolved_penalty
        };

        if candidate.method == DetectionMethod::Context && candidate.signals > 1 {
            let extra = (candidate.signals - 1) as f64 * w.context_signal_bonus;
            score += extra.min(w.context_signal_cap);
        }

        if score.is_nan() {
            return 0.0;
        }
        score.clamp(0.0, 1.0)
    }
}
