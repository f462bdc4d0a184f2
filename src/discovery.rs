//! Discovery: ranked, filtered, enriched and paginated match lists.
//!
//! [`DiscoveryPipeline`] composes the [`VectorIndex`] and the
//! [`CompatibilityScorer`] with business filtering. It performs no I/O of its
//! own beyond the enrichment lookups on the injected [`RelationshipStore`].

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{MatchError, MatchResult};
use crate::scoring::CompatibilityScorer;
use crate::store::{CandidateFilter, CandidatePool, RelationshipStore};
use crate::types::{FriendStatus, Trait, TraitVector, UserId};
use crate::vector::VectorIndex;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Page size used when the caller does not pass one.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// A validated page request (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: usize,
    limit: usize,
}

impl PageRequest {
    /// Fails unless `page >= 1` and `1 <= limit <= 100`.
    pub fn new(page: usize, limit: usize) -> MatchResult<Self> {
        if page == 0 {
            return Err(MatchError::invalid("page must be at least 1"));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(MatchError::invalid(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn bounds(&self) -> (usize, usize) {
        let start = (self.page - 1).saturating_mul(self.limit);
        (start, start.saturating_add(self.limit))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Caller-supplied discovery filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryFilters {
    /// Applied by the store when building the pool
    pub candidates: CandidateFilter,
    /// Drop candidates scoring below this
    pub min_compatibility: Option<f64>,
}

impl DiscoveryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_compatibility(mut self, threshold: f64) -> Self {
        self.min_compatibility = Some(threshold);
        self
    }

    pub fn candidates(mut self, filter: CandidateFilter) -> Self {
        self.candidates = filter;
        self
    }

    /// Parse the wire form of `min_compatibility`: `"all"` or a number.
    pub fn parse_min_compatibility(value: &str) -> MatchResult<Option<f64>> {
        let value = value.trim();
        if value.is_empty() || value == "all" {
            return Ok(None);
        }
        let threshold: f64 = value.parse().map_err(|_| {
            MatchError::invalid(format!(
                "min_compatibility must be 'all' or a number, got '{}'",
                value
            ))
        })?;
        if !threshold.is_finite() {
            return Err(MatchError::invalid("min_compatibility must be finite"));
        }
        Ok(Some(threshold))
    }
}

/// One ranked candidate in a discovery page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityRecord {
    pub candidate_id: UserId,
    pub compatibility_score: f64,
    pub distance: f64,
    pub friend_status: FriendStatus,
    pub mutual_friend_count: usize,
}

/// A candidate dropped before ranking, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCandidate {
    pub candidate_id: UserId,
    pub reason: String,
}

/// Non-fatal report of pool entries that could not be ranked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartialDataWarning {
    pub skipped: Vec<SkippedCandidate>,
}

impl PartialDataWarning {
    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// One page of discovery output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryPage {
    pub records: Vec<CompatibilityRecord>,
    pub total_count: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
    #[serde(skip)]
    pub warnings: PartialDataWarning,
}

impl DiscoveryPage {
    fn empty(request: PageRequest, warnings: PartialDataWarning) -> Self {
        Self {
            records: Vec::new(),
            total_count: 0,
            page: request.page,
            limit: request.limit,
            has_more: false,
            warnings,
        }
    }
}

/// Orchestrates index, scorer and store for one viewer at a time.
pub struct DiscoveryPipeline<S: ?Sized> {
    store: Arc<S>,
    scorer: CompatibilityScorer,
}

impl<S: ?Sized> Clone for DiscoveryPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            scorer: self.scorer,
        }
    }
}

impl<S> DiscoveryPipeline<S>
where
    S: RelationshipStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            scorer: CompatibilityScorer::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch the viewer's vector and pool from the store, then [`discover`].
    ///
    /// [`discover`]: DiscoveryPipeline::discover
    pub async fn discover_for(
        &self,
        viewer: UserId,
        filters: &DiscoveryFilters,
        request: PageRequest,
    ) -> MatchResult<DiscoveryPage> {
        let query = self
            .store
            .current_traits(viewer)
            .await?
            .ok_or(MatchError::MissingAssessment)?;
        let pool = self
            .store
            .eligible_candidates(viewer, &filters.candidates)
            .await?;
        self.discover(viewer, Some(&query), pool, filters, request)
            .await
    }

    /// Rank `pool` against `query` and return one page.
    ///
    /// Invalid pool entries are skipped and reported in
    /// [`DiscoveryPage::warnings`]. An empty valid pool yields an empty page.
    /// Only a missing `query` is fatal.
    pub async fn discover(
        &self,
        viewer: UserId,
        query: Option<&TraitVector>,
        pool: CandidatePool,
        filters: &DiscoveryFilters,
        request: PageRequest,
    ) -> MatchResult<DiscoveryPage> {
        let query = query.ok_or(MatchError::MissingAssessment)?;

        let (valid, warnings) = validate_pool(pool);
        if !warnings.is_empty() {
            warn!(
                viewer,
                skipped = warnings.skipped.len(),
                "Skipped candidates with invalid personality data"
            );
        }

        let index = match VectorIndex::new(valid.iter().map(|(id, v)| (*id, *v.as_array()))) {
            Ok(index) => index,
            Err(e) => {
                debug!(viewer, error = %e, "No rankable candidates");
                return Ok(DiscoveryPage::empty(request, warnings));
            }
        };
        let vectors: HashMap<UserId, TraitVector> = valid.into_iter().collect();

        let ranked = index.find_k_nearest_vectorized(query.as_array(), index.len())?;
        debug!(viewer, ranked = ranked.len(), "Ranked candidate pool");

        let mut records = Vec::with_capacity(ranked.len());
        for neighbor in ranked {
            let Some(candidate) = vectors.get(&neighbor.id) else {
                continue;
            };
            let score = self.scorer.score(query, candidate);
            if filters.min_compatibility.is_some_and(|min| score < min) {
                continue;
            }
            records.push(CompatibilityRecord {
                candidate_id: neighbor.id,
                compatibility_score: score,
                distance: neighbor.distance,
                friend_status: self.store.friend_status(viewer, neighbor.id).await?,
                mutual_friend_count: self.store.mutual_friend_count(viewer, neighbor.id).await?,
            });
        }

        // Stable: equal scores keep distance rank order.
        records.sort_by(|a, b| b.compatibility_score.total_cmp(&a.compatibility_score));

        let total_count = records.len();
        let (start, end) = request.bounds();
        let page_records: Vec<CompatibilityRecord> =
            records.into_iter().skip(start).take(request.limit).collect();

        Ok(DiscoveryPage {
            records: page_records,
            total_count,
            page: request.page,
            limit: request.limit,
            has_more: end < total_count,
            warnings,
        })
    }
}

/// Split a pool into rankable vectors and skipped entries.
///
/// Keeps pool order. A repeated id keeps its first occurrence.
fn validate_pool(pool: CandidatePool) -> (Vec<(UserId, TraitVector)>, PartialDataWarning) {
    let mut valid = Vec::with_capacity(pool.len());
    let mut warnings = PartialDataWarning::default();
    let mut seen = HashSet::new();

    for candidate in pool {
        if !seen.insert(candidate.id) {
            warnings.skipped.push(SkippedCandidate {
                candidate_id: candidate.id,
                reason: "duplicate candidate id".to_string(),
            });
            continue;
        }
        match TraitVector::from_raw(&candidate.traits) {
            Ok(vector) => valid.push((candidate.id, vector)),
            Err(e) => {
                debug!(candidate = candidate.id, error = %e, "Skipping candidate");
                warnings.skipped.push(SkippedCandidate {
                    candidate_id: candidate.id,
                    reason: match e {
                        MatchError::InvalidInput { reason } => reason,
                        other => other.to_string(),
                    },
                });
            }
        }
    }
    (valid, warnings)
}

// ============================================================================
// Personality insights
// ============================================================================

/// How far either side of a user's own score an ideal match may sit.
const IDEAL_RANGE_SPREAD: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchRange {
    pub min: f64,
    pub max: f64,
}

/// Matching guidance derived from a user's own profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalityInsights {
    pub your_profile: TraitVector,
    pub ideal_match_ranges: BTreeMap<&'static str, MatchRange>,
    pub compatibility_tips: Vec<&'static str>,
}

/// Ideal match ranges and tips for `profile`.
pub fn personality_insights(profile: &TraitVector) -> PersonalityInsights {
    let ideal_match_ranges = Trait::ALL
        .into_iter()
        .map(|t| {
            let score = profile.get(t);
            let range = MatchRange {
                min: (score - IDEAL_RANGE_SPREAD).max(0.0),
                max: (score + IDEAL_RANGE_SPREAD).min(100.0),
            };
            (t.name(), range)
        })
        .collect();

    let mut tips = Vec::new();
    let extraversion = profile.get(Trait::Extraversion);
    if extraversion > 70.0 {
        tips.push("You're highly extraverted - look for people who enjoy social activities and group settings.");
    } else if extraversion < 40.0 {
        tips.push("You prefer quieter settings - seek friends who appreciate deep, meaningful conversations.");
    }
    if profile.get(Trait::Agreeableness) > 70.0 {
        tips.push("Your cooperative nature pairs well with others who value harmony and teamwork.");
    }
    if profile.get(Trait::Conscientiousness) > 70.0 {
        tips.push("You're highly organized - you'll connect well with goal-oriented, reliable people.");
    }
    if profile.get(Trait::EmotionalStability) > 70.0 {
        tips.push("Your emotional stability makes you a great support for others going through challenges.");
    }
    if profile.get(Trait::IntellectImagination) > 70.0 {
        tips.push("Your creativity and openness to experience attracts like-minded innovative thinkers.");
    }

    PersonalityInsights {
        your_profile: *profile,
        ideal_match_ranges,
        compatibility_tips: tips,
    }
}
