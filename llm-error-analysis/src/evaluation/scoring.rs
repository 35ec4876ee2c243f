//! Criterion scores and the weighted total

use serde::{Deserialize, Serialize};

use super::features::ResponseFeatures;

/// Maximum points per criterion, in the order of `CriterionScores`
pub const TECHNICAL_ACCURACY_MAX: f64 = 25.0;
pub const SOLUTION_QUALITY_MAX: f64 = 25.0;
pub const CLARITY_MAX: f64 = 20.0;
pub const CONCISENESS_MAX: f64 = 10.0;
pub const SPEED_MAX: f64 = 10.0;
pub const RELIABILITY_MAX: f64 = 10.0;

const WORD_COUNT_OPTIMAL: (usize, usize) = (300, 800);
const WORD_COUNT_ACCEPTABLE: (usize, usize) = (200, 1000);
const WORD_COUNT_POOR: (usize, usize) = (100, 1500);

const RESPONSE_TIME_EXCELLENT_MS: i64 = 5_000;
const RESPONSE_TIME_GOOD_MS: i64 = 15_000;
const RESPONSE_TIME_ACCEPTABLE_MS: i64 = 30_000;

/// Share of the 0-100 total given to each criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub technical_accuracy: f64,
    pub solution_quality: f64,
    pub clarity: f64,
    pub conciseness: f64,
    pub speed: f64,
    pub reliability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            technical_accuracy: 0.25,
            solution_quality: 0.25,
            clarity: 0.20,
            conciseness: 0.10,
            speed: 0.10,
            reliability: 0.10,
        }
    }
}

/// Points per criterion, each on its own scale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub technical_accuracy: f64,
    pub solution_quality: f64,
    pub clarity: f64,
    pub conciseness: f64,
    pub speed: f64,
    pub reliability: f64,
}

impl CriterionScores {
    /// Normalize each criterion to 0-100 and apply the weights
    pub fn weighted_total(&self, weights: &ScoreWeights) -> f64 {
        (self.technical_accuracy / TECHNICAL_ACCURACY_MAX) * 100.0 * weights.technical_accuracy
            + (self.solution_quality / SOLUTION_QUALITY_MAX) * 100.0 * weights.solution_quality
            + (self.clarity / CLARITY_MAX) * 100.0 * weights.clarity
            + (self.conciseness / CONCISENESS_MAX) * 100.0 * weights.conciseness
            + (self.speed / SPEED_MAX) * 100.0 * weights.speed
            + (self.reliability / RELIABILITY_MAX) * 100.0 * weights.reliability
    }

    pub(crate) fn add(&mut self, other: &CriterionScores) {
        self.technical_accuracy += other.technical_accuracy;
        self.solution_quality += other.solution_quality;
        self.clarity += other.clarity;
        self.conciseness += other.conciseness;
        self.speed += other.speed;
        self.reliability += other.reliability;
    }

    pub(crate) fn divided_by(&self, n: usize) -> CriterionScores {
        if n == 0 {
            return CriterionScores::default();
        }
        let n = n as f64;
        CriterionScores {
            technical_accuracy: self.technical_accuracy / n,
            solution_quality: self.solution_quality / n,
            clarity: self.clarity / n,
            conciseness: self.conciseness / n,
            speed: self.speed / n,
            reliability: self.reliability / n,
        }
    }
}

/// Scores for one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseScore {
    pub criteria: CriterionScores,
    pub total: f64,
}

/// Error keyword, cause, technical density and code examples
pub fn score_technical_accuracy(features: &ResponseFeatures) -> f64 {
    let mut score = 0.0;
    if features.has_error_keyword {
        score += 5.0;
    }
    if features.has_cause_keyword {
        score += 5.0;
    }
    score += (features.technical_terms / 3).min(7) as f64;
    if features.code_blocks > 0 {
        score += 8.0;
    }
    score.min(TECHNICAL_ACCURACY_MAX)
}

/// Solution wording, structured steps, code and alternatives
pub fn score_solution_quality(features: &ResponseFeatures) -> f64 {
    let mut score: f64 = 0.0;
    if features.has_solution_keyword {
        score += 5.0;
    }
    if features.numbered_lists > 0 || features.bullet_points > 2 {
        score += 8.0;
    }
    if features.code_blocks > 0 {
        score += 8.0;
    }
    if features.has_alternative_keyword {
        score += 4.0;
    }
    score.min(SOLUTION_QUALITY_MAX)
}

pub fn score_clarity(features: &ResponseFeatures) -> f64 {
    let mut score: f64 = 0.0;
    if features.headings > 0 {
        score += 5.0;
    }
    if features.bullet_points > 0 || features.numbered_lists > 0 {
        score += 5.0;
    }
    if features.paragraph_count >= 3 {
        score += 5.0;
    }
    if features.has_visual_markers {
        score += 5.0;
    }
    score.min(CLARITY_MAX)
}

/// 300-800 words is optimal
pub fn score_conciseness(features: &ResponseFeatures) -> f64 {
    let within = |(low, high): (usize, usize)| (low..=high).contains(&features.word_count);
    if within(WORD_COUNT_OPTIMAL) {
        10.0
    } else if within(WORD_COUNT_ACCEPTABLE) {
        7.0
    } else if within(WORD_COUNT_POOR) {
        4.0
    } else {
        1.0
    }
}

/// No recorded latency scores zero
pub fn score_response_time(elapsed_ms: Option<i64>) -> f64 {
    match elapsed_ms {
        None => 0.0,
        Some(ms) if ms < RESPONSE_TIME_EXCELLENT_MS => 10.0,
        Some(ms) if ms < RESPONSE_TIME_GOOD_MS => 7.0,
        Some(ms) if ms < RESPONSE_TIME_ACCEPTABLE_MS => 4.0,
        Some(_) => 1.0,
    }
}

pub fn score_reliability(is_error: bool) -> f64 {
    if is_error {
        0.0
    } else {
        RELIABILITY_MAX
    }
}

/// Score one response across every criterion
pub fn score_response(
    features: &ResponseFeatures,
    elapsed_ms: Option<i64>,
    is_error: bool,
    weights: &ScoreWeights,
) -> ResponseScore {
    let criteria = CriterionScores {
        technical_accuracy: score_technical_accuracy(features),
        solution_quality: score_solution_quality(features),
        clarity: score_clarity(features),
        conciseness: score_conciseness(features),
        speed: score_response_time(elapsed_ms),
        reliability: score_reliability(is_error),
    };
    let total = criteria.weighted_total(weights);
    ResponseScore { criteria, total }
}
