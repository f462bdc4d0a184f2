//! Distance metrics over trait vectors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MatchError;

/// Distance function selectable per query.
///
/// Smaller is always closer, for every metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `sqrt(sum((a_i - b_i)^2))`
    #[default]
    Euclidean,
    /// `sum(|a_i - b_i|)`
    Manhattan,
    /// `1 - cos(a, b)`; 1.0 when either vector has zero norm.
    Cosine,
}

impl DistanceMetric {
    /// Every supported metric, in the order they are listed to callers.
    pub const ALL: [DistanceMetric; 3] = [
        DistanceMetric::Euclidean,
        DistanceMetric::Manhattan,
        DistanceMetric::Cosine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Manhattan => "manhattan",
            DistanceMetric::Cosine => "cosine",
        }
    }

    /// Distance between two equally sized vectors.
    pub fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::Euclidean => euclidean(a, b),
            DistanceMetric::Manhattan => manhattan(a, b),
            DistanceMetric::Cosine => cosine(a, b),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistanceMetric::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> = DistanceMetric::ALL.iter().map(|m| m.name()).collect();
                MatchError::invalid(format!(
                    "unknown distance metric '{}'; must be one of: {}",
                    s,
                    supported.join(", ")
                ))
            })
    }
}

/// Euclidean distance.
///
/// Accumulates squared differences left to right starting from 0.0. The
/// batched path in [`super::VectorIndex`] uses the same order so both produce
/// bit-identical results.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b) {
        let diff = y - x;
        sum += diff * diff;
    }
    sum.sqrt()
}

/// Manhattan (L1) distance.
pub fn manhattan(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Cosine distance. A zero vector is at distance 1.0 from everything.
///
/// Each side is divided by its largest magnitude first, so any finite input
/// gives a finite result.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let scale_a = max_magnitude(a);
    let scale_b = max_magnitude(b);
    if scale_a == 0.0 || scale_b == 0.0 {
        return 1.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x / scale_a, y / scale_b);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn max_magnitude(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |max, x| max.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance() {
        let d = euclidean(&[0.0, 0.0, 0.0, 0.0, 0.0], &[3.0, 4.0, 0.0, 0.0, 0.0]);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_manhattan_distance() {
        let d = manhattan(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(d, 12.0);
    }

    #[test]
    fn test_cosine_parallel_vectors() {
        let d = cosine(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(d.abs() < 1e-12);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let d = cosine(&[1.0, 0.0, 0.0, 0.0, 0.0], &[0.0, 1.0, 0.0, 0.0, 0.0]);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_zero_vector_is_max_distance() {
        let zero = [0.0; 5];
        assert_eq!(cosine(&zero, &[10.0, 20.0, 30.0, 40.0, 50.0]), 1.0);
        assert_eq!(cosine(&[10.0, 20.0, 30.0, 40.0, 50.0], &zero), 1.0);
        assert_eq!(cosine(&zero, &zero), 1.0);
    }

    #[test]
    fn test_cosine_huge_magnitudes_stay_finite() {
        let a = [1e200, 2e200, 3e200, 4e200, 5e200];
        let b = [2e200, 4e200, 6e200, 8e200, 1e201];
        let d = cosine(&a, &b);
        assert!(d.is_finite());
        assert!(d.abs() < 1e-12);

        let d = cosine(&[1e300, 0.0, 0.0, 0.0, 0.0], &[0.0, 1e-300, 0.0, 0.0, 0.0]);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("manhattan".parse::<DistanceMetric>().unwrap(), DistanceMetric::Manhattan);
        let err = "chebyshev".parse::<DistanceMetric>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("euclidean, manhattan, cosine"), "{}", msg);
    }
}
