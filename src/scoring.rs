/// Compatibility scoring between two personality profiles.
///
/// A score is the inverse-distance similarity on the [0,100] trait space plus
/// a fixed table of complementarity bonuses, capped at 100 and rounded to one
/// decimal place.
///
/// The score is asymmetric: the extraversion rule checks the *current user's*
/// extraversion against the *candidate's* agreeableness. Always pass the
/// current user as `a` and the candidate as `b`.
use serde::Serialize;

use crate::types::{DIMENSIONS, TRAIT_MAX, Trait, TraitVector};
use crate::vector::metric::euclidean;

/// Largest possible euclidean distance inside [0,100]^5.
pub fn max_distance() -> f64 {
    (DIMENSIONS as f64 * TRAIT_MAX * TRAIT_MAX).sqrt()
}

/// One rule from the complementarity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bonus {
    /// Outgoing current user, moderately agreeable candidate.
    ExtraversionAgreeableness,
    /// Both conscientious.
    SharedConscientiousness,
    /// Both emotionally stable.
    SharedEmotionalStability,
    /// Some, but not too much, difference in intellect/imagination.
    IntellectVariety,
}

impl Bonus {
    pub const ALL: [Bonus; 4] = [
        Bonus::ExtraversionAgreeableness,
        Bonus::SharedConscientiousness,
        Bonus::SharedEmotionalStability,
        Bonus::IntellectVariety,
    ];

    /// Points added when the rule fires.
    pub fn points(self) -> f64 {
        match self {
            Bonus::IntellectVariety => 3.0,
            _ => 5.0,
        }
    }

    /// Whether the rule fires for current user `a` and candidate `b`.
    pub fn applies(self, a: &TraitVector, b: &TraitVector) -> bool {
        match self {
            Bonus::ExtraversionAgreeableness => {
                a.get(Trait::Extraversion) > 70.0
                    && (40.0..=80.0).contains(&b.get(Trait::Agreeableness))
            }
            Bonus::SharedConscientiousness => {
                a.get(Trait::Conscientiousness) > 60.0 && b.get(Trait::Conscientiousness) > 60.0
            }
            Bonus::SharedEmotionalStability => {
                a.get(Trait::EmotionalStability) > 50.0 && b.get(Trait::EmotionalStability) > 50.0
            }
            Bonus::IntellectVariety => {
                let diff =
                    (a.get(Trait::IntellectImagination) - b.get(Trait::IntellectImagination)).abs();
                (10.0..=30.0).contains(&diff)
            }
        }
    }
}

/// How a score was put together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Euclidean distance between the two vectors
    pub distance: f64,
    /// Inverse-distance similarity in [0,100], before bonuses
    pub similarity: f64,
    /// Rules that fired
    pub bonuses: Vec<Bonus>,
    /// Final rounded score in [0,100]
    pub score: f64,
}

/// Deterministic rule-table scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityScorer;

impl CompatibilityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Compatibility of candidate `b` for current user `a`, in [0,100].
    pub fn score(&self, a: &TraitVector, b: &TraitVector) -> f64 {
        self.breakdown(a, b).score
    }

    /// Full scoring detail for current user `a` and candidate `b`.
    pub fn breakdown(&self, a: &TraitVector, b: &TraitVector) -> ScoreBreakdown {
        let distance = euclidean(a.as_array(), b.as_array());
        let similarity = (100.0 - distance / max_distance() * 100.0).max(0.0);

        let bonuses: Vec<Bonus> = Bonus::ALL
            .into_iter()
            .filter(|bonus| bonus.applies(a, b))
            .collect();
        let bonus_points: f64 = bonuses.iter().map(|b| b.points()).sum();

        let score = round_one_decimal((similarity + bonus_points).min(100.0));
        ScoreBreakdown {
            distance,
            similarity,
            bonuses,
            score,
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
