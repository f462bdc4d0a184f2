//! Exact k-nearest-neighbour search over a per-query candidate pool.
//!
//! The index is a flat, row-major matrix of trait vectors built fresh for each
//! discovery request. Pools are small (hundreds to low thousands of users), so
//! a linear scan is used and every answer is exact.
//!
//! Ties on distance are broken by pool position: a candidate enumerated
//! earlier always ranks ahead of a later candidate at the same distance. Both
//! search paths apply this rule, which keeps the top-k cutoff deterministic
//! for a given pool ordering.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use super::metric::DistanceMetric;
use crate::error::{MatchError, MatchResult};
use crate::types::DIMENSIONS;

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<K> {
    /// Identifier the candidate was inserted under
    pub id: K,
    /// Distance from the query under the requested metric
    pub distance: f64,
}

/// A flat (brute-force) index of five-dimensional vectors.
#[derive(Clone)]
pub struct VectorIndex<K> {
    ids: Vec<K>,
    /// `ids.len() * DIMENSIONS` values, one row per candidate.
    rows: Vec<f64>,
}

impl<K: fmt::Debug> fmt::Debug for VectorIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("len", &self.ids.len())
            .finish()
    }
}

impl<K> VectorIndex<K>
where
    K: Clone + Eq + Hash + fmt::Debug,
{
    /// Build an index from `(id, vector)` pairs.
    ///
    /// Fails with [`MatchError::InvalidInput`] if the pool is empty, an id
    /// repeats, a vector does not have exactly five components, or a
    /// component is NaN or infinite. Iteration order of `pool` becomes the
    /// tie-break order.
    pub fn new<I, V>(pool: I) -> MatchResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        V: AsRef<[f64]>,
    {
        let pool = pool.into_iter();
        let mut ids = Vec::with_capacity(pool.size_hint().0);
        let mut rows = Vec::with_capacity(pool.size_hint().0 * DIMENSIONS);
        let mut seen = HashSet::new();

        for (id, vector) in pool {
            let vector = vector.as_ref();
            if vector.len() != DIMENSIONS {
                return Err(MatchError::invalid(format!(
                    "vector for {:?} has {} components, expected {}",
                    id,
                    vector.len(),
                    DIMENSIONS
                )));
            }
            if let Some(bad) = vector.iter().find(|v| !v.is_finite()) {
                return Err(MatchError::invalid(format!(
                    "vector for {:?} has non-finite component {}",
                    id, bad
                )));
            }
            if !seen.insert(id.clone()) {
                return Err(MatchError::invalid(format!("duplicate candidate id {:?}", id)));
            }
            ids.push(id);
            rows.extend_from_slice(vector);
        }

        if ids.is_empty() {
            return Err(MatchError::invalid("candidate pool is empty"));
        }

        Ok(Self { ids, rows })
    }

    /// Number of candidates in the index.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false: construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Candidate ids in pool order.
    pub fn ids(&self) -> &[K] {
        &self.ids
    }

    fn row(&self, position: usize) -> &[f64] {
        &self.rows[position * DIMENSIONS..(position + 1) * DIMENSIONS]
    }

    /// Find the `k` nearest candidates under `metric`.
    ///
    /// `k` is clamped to the pool size. Results are sorted by ascending
    /// distance with ties in pool order.
    pub fn find_k_nearest(
        &self,
        query: &[f64],
        k: usize,
        metric: DistanceMetric,
    ) -> MatchResult<Vec<Neighbor<K>>> {
        check_query(query)?;
        let k = k.min(self.len());

        let mut scored: Vec<(usize, f64)> = (0..self.len())
            .map(|position| (position, metric.distance(query, self.row(position))))
            .collect();
        // Stable sort: equal distances keep pool order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| Neighbor {
                id: self.ids[position].clone(),
                distance,
            })
            .collect())
    }

    /// Euclidean k-NN computed in one batched pass with partial selection.
    ///
    /// All distances are produced column by column over the whole matrix,
    /// then the `k` smallest are partitioned out with `select_nth_unstable_by`
    /// and only those are sorted. Output is identical to
    /// `find_k_nearest(query, k, DistanceMetric::Euclidean)`.
    pub fn find_k_nearest_vectorized(
        &self,
        query: &[f64],
        k: usize,
    ) -> MatchResult<Vec<Neighbor<K>>> {
        check_query(query)?;
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let distances = self.batch_euclidean(query);

        let mut positions: Vec<usize> = (0..self.len()).collect();
        let order = |a: &usize, b: &usize| -> Ordering {
            distances[*a]
                .total_cmp(&distances[*b])
                .then_with(|| a.cmp(b))
        };
        if k < positions.len() {
            positions.select_nth_unstable_by(k - 1, order);
            positions.truncate(k);
        }
        positions.sort_unstable_by(order);

        Ok(positions
            .into_iter()
            .map(|position| Neighbor {
                id: self.ids[position].clone(),
                distance: distances[position],
            })
            .collect())
    }

    /// Squared differences summed column by column, then square-rooted.
    fn batch_euclidean(&self, query: &[f64]) -> Vec<f64> {
        let mut sums = vec![0.0f64; self.len()];
        for (column, q) in query.iter().enumerate() {
            for (sum, row) in sums.iter_mut().zip(self.rows.chunks_exact(DIMENSIONS)) {
                let diff = row[column] - q;
                *sum += diff * diff;
            }
        }
        for sum in &mut sums {
            *sum = sum.sqrt();
        }
        sums
    }
}

fn check_query(query: &[f64]) -> MatchResult<()> {
    if query.len() != DIMENSIONS {
        return Err(MatchError::invalid(format!(
            "query must have exactly {} components, got {}",
            DIMENSIONS,
            query.len()
        )));
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(MatchError::invalid("query has a non-finite component"));
    }
    Ok(())
}
