//! Questionnaire scoring: raw Likert answers to a canonical trait vector.
//!
//! Quiz items are answered on a 1-5 Likert scale. Negatively keyed items are
//! reversed (`6 - r`) and each factor's score is the mean of its items, which
//! lands in [1,5]. [`LikertScores::to_trait_vector`] is the single point where
//! that scale is mapped onto the [0,100] scale used by matching.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MatchError, MatchResult};
use crate::types::{DIMENSIONS, Trait, TraitVector};

/// Lowest Likert answer ("very inaccurate").
pub const LIKERT_MIN: u8 = 1;
/// Highest Likert answer ("very accurate").
pub const LIKERT_MAX: u8 = 5;

/// Direction an item is keyed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keying {
    #[serde(rename = "+")]
    Positive,
    #[serde(rename = "-")]
    Negative,
}

/// A single questionnaire item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionItem {
    pub id: u32,
    pub question: String,
    pub factor: Trait,
    #[serde(rename = "correlation")]
    pub keying: Keying,
}

impl QuestionItem {
    pub fn new(id: u32, question: impl Into<String>, factor: Trait, keying: Keying) -> Self {
        Self {
            id,
            question: question.into(),
            factor,
            keying,
        }
    }

    /// Apply reverse keying to a validated answer.
    fn keyed(&self, response: u8) -> f64 {
        match self.keying {
            Keying::Positive => f64::from(response),
            Keying::Negative => f64::from(LIKERT_MAX + 1 - response),
        }
    }
}

/// Per-factor Likert means in [1,5].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LikertScores {
    means: [f64; DIMENSIONS],
}

impl LikertScores {
    pub fn get(&self, t: Trait) -> f64 {
        self.means[t.index()]
    }

    /// Map each mean from [1,5] onto [0,100] linearly.
    pub fn to_trait_vector(&self) -> MatchResult<TraitVector> {
        let span = f64::from(LIKERT_MAX - LIKERT_MIN);
        TraitVector::new(
            self.means
                .map(|mean| (mean - f64::from(LIKERT_MIN)) / span * 100.0),
        )
    }
}

/// Item-level detail for one factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorBreakdown {
    pub mean_score: f64,
    pub num_items: usize,
    /// Answers after reverse keying
    pub item_scores: Vec<f64>,
    /// Answers as given
    pub original_responses: Vec<u8>,
    pub item_ids: Vec<u32>,
}

/// Factor scores plus per-factor breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringReport {
    pub scores: LikertScores,
    pub total_items: usize,
    pub factors: BTreeMap<&'static str, FactorBreakdown>,
}

/// An ordered set of questionnaire items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    items: Vec<QuestionItem>,
}

impl Questionnaire {
    pub fn new(items: Vec<QuestionItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[QuestionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items belonging to one factor.
    pub fn factor_items(&self, factor: Trait) -> impl Iterator<Item = &QuestionItem> {
        self.items.iter().filter(move |item| item.factor == factor)
    }

    fn validate(&self, responses: &[u8]) -> MatchResult<()> {
        if responses.len() != self.items.len() {
            return Err(MatchError::invalid(format!(
                "number of responses ({}) must match number of questions ({})",
                responses.len(),
                self.items.len()
            )));
        }
        if let Some(bad) = responses
            .iter()
            .find(|r| !(LIKERT_MIN..=LIKERT_MAX).contains(r))
        {
            return Err(MatchError::invalid(format!(
                "all responses must be between {} and {}, got {}",
                LIKERT_MIN, LIKERT_MAX, bad
            )));
        }
        Ok(())
    }

    /// Mean keyed score per factor.
    pub fn score(&self, responses: &[u8]) -> MatchResult<LikertScores> {
        Ok(self.detailed_report(responses)?.scores)
    }

    /// Factor scores together with item-level detail.
    pub fn detailed_report(&self, responses: &[u8]) -> MatchResult<ScoringReport> {
        self.validate(responses)?;

        let mut means = [0.0; DIMENSIONS];
        let mut factors = BTreeMap::new();
        for factor in Trait::ALL {
            let mut breakdown = FactorBreakdown {
                mean_score: 0.0,
                num_items: 0,
                item_scores: Vec::new(),
                original_responses: Vec::new(),
                item_ids: Vec::new(),
            };
            for (item, &response) in self.items.iter().zip(responses) {
                if item.factor != factor {
                    continue;
                }
                breakdown.item_scores.push(item.keyed(response));
                breakdown.original_responses.push(response);
                breakdown.item_ids.push(item.id);
            }
            if breakdown.item_scores.is_empty() {
                return Err(MatchError::invalid(format!(
                    "questionnaire has no items for {}",
                    factor
                )));
            }
            breakdown.num_items = breakdown.item_scores.len();
            breakdown.mean_score =
                breakdown.item_scores.iter().sum::<f64>() / breakdown.num_items as f64;
            means[factor.index()] = breakdown.mean_score;
            factors.insert(factor.name(), breakdown);
        }

        Ok(ScoringReport {
            scores: LikertScores { means },
            total_items: responses.len(),
            factors,
        })
    }
}
