//! The relationship store: the boundary between matching and persistence.
//!
//! Discovery only needs the four reads in [`RelationshipStore`]. The
//! [`MemoryStore`] implementation backs them with concurrent in-memory maps
//! and also carries the conventional CRUD the HTTP layer uses: accounts,
//! sessions, quiz results with history, and friendships.
//!
//! There is no sign-up or login route. Accounts and sessions are provisioned
//! through this API directly (`register_user`, `create_session`,
//! `set_active`, `delete_user`) or loaded from a seed fixture with
//! [`MemoryStore::load_seed`]. Expired sessions are rejected on lookup and
//! swept periodically by [`MemoryStore::spawn_session_sweeper`], which the
//! HTTP server starts.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration as StdDuration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::error::{MatchError, MatchResult};
use crate::types::{FriendStatus, RawTraits, Trait, TraitVector, UserId, UserProfile};

/// Default session lifetime: 24 hours.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 86400;

/// Read-only port discovery depends on.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// The user's current personality vector, if they have taken the quiz.
    async fn current_traits(&self, user: UserId) -> MatchResult<Option<TraitVector>>;

    /// Other discoverable users with a current result that match `filter`.
    async fn eligible_candidates(
        &self,
        viewer: UserId,
        filter: &CandidateFilter,
    ) -> MatchResult<CandidatePool>;

    /// Relationship between `a` and `b`, in either direction.
    async fn friend_status(&self, a: UserId, b: UserId) -> MatchResult<FriendStatus>;

    /// Number of users who are accepted friends of both `a` and `b`.
    async fn mutual_friend_count(&self, a: UserId, b: UserId) -> MatchResult<usize>;
}

// ============================================================================
// Candidate pool and filtering
// ============================================================================

/// A candidate as read from storage. Components may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: UserId,
    pub traits: RawTraits,
}

impl Candidate {
    pub fn new(id: UserId, traits: RawTraits) -> Self {
        Self { id, traits }
    }

    /// A candidate whose every component is present.
    pub fn complete(id: UserId, traits: [f64; 5]) -> Self {
        Self::new(id, traits.map(Some))
    }
}

/// The per-query set of users eligible for matching, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }
}

impl FromIterator<Candidate> for CandidatePool {
    fn from_iter<T: IntoIterator<Item = Candidate>>(iter: T) -> Self {
        Self {
            candidates: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CandidatePool {
    type Item = Candidate;
    type IntoIter = std::vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}

/// Bucket over account age, derived from `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBucket {
    #[serde(rename = "18-25")]
    From18To25,
    #[serde(rename = "26-35")]
    From26To35,
    #[serde(rename = "36-45")]
    From36To45,
    #[serde(rename = "46+")]
    Over46,
}

impl AgeBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            AgeBucket::From18To25 => "18-25",
            AgeBucket::From26To35 => "26-35",
            AgeBucket::From36To45 => "36-45",
            AgeBucket::Over46 => "46+",
        }
    }

    /// Parse a wire value where `"all"` means no bucket.
    pub fn parse_filter(value: &str) -> MatchResult<Option<Self>> {
        if value == "all" {
            return Ok(None);
        }
        value.parse().map(Some)
    }

    /// Whether an account created at `created_at` falls in this bucket.
    ///
    /// Bounds are whole-year intervals back from `now`; the middle buckets
    /// are inclusive on both ends.
    pub fn contains(self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let years_ago = |years: u32| now.checked_sub_months(Months::new(years * 12));
        let (Some(seven), Some(fifteen), Some(twenty_five)) =
            (years_ago(7), years_ago(15), years_ago(25))
        else {
            return false;
        };
        match self {
            AgeBucket::From18To25 => created_at >= seven,
            AgeBucket::From26To35 => created_at >= fifteen && created_at <= seven,
            AgeBucket::From36To45 => created_at >= twenty_five && created_at <= fifteen,
            AgeBucket::Over46 => created_at < twenty_five,
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeBucket {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "18-25" => Ok(AgeBucket::From18To25),
            "26-35" => Ok(AgeBucket::From26To35),
            "36-45" => Ok(AgeBucket::From36To45),
            "46+" => Ok(AgeBucket::Over46),
            other => Err(MatchError::invalid(format!(
                "unknown age range '{}'; must be one of: all, 18-25, 26-35, 36-45, 46+",
                other
            ))),
        }
    }
}

/// Store-side candidate filter: free-text search and age bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFilter {
    pub search: Option<String>,
    pub age_bucket: Option<AgeBucket>,
}

impl CandidateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn age_bucket(mut self, bucket: AgeBucket) -> Self {
        self.age_bucket = Some(bucket);
        self
    }

    /// Whether `profile` passes the filter at time `now`.
    pub fn matches(&self, profile: &UserProfile, now: DateTime<Utc>) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = [
                Some(profile.username.as_str()),
                profile.first_name.as_deref(),
                profile.last_name.as_deref(),
                profile.bio.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        match self.age_bucket {
            Some(bucket) => bucket.contains(profile.created_at, now),
            None => true,
        }
    }
}

// ============================================================================
// Stored records
// ============================================================================

/// One saved quiz outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub id: i64,
    pub user_id: UserId,
    pub traits: TraitVector,
    pub test_version: String,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}

/// Aggregate over a user's quiz history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizStats {
    pub total_tests: usize,
    pub first_test: Option<DateTime<Utc>>,
    pub latest_test: Option<DateTime<Utc>>,
    /// Per-trait means rounded to one decimal, keyed by trait name
    pub averages: Option<std::collections::BTreeMap<&'static str, f64>>,
}

/// An edge in the friend graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Friendship {
    pub requested_by: UserId,
    pub addressee: UserId,
    pub status: FriendStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Friendship {
    /// The other end of the edge as seen from `user`.
    pub fn other(&self, user: UserId) -> UserId {
        if self.requested_by == user {
            self.addressee
        } else {
            self.requested_by
        }
    }
}

/// An opaque bearer session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Per-user discovery summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryStats {
    pub has_personality_results: bool,
    pub total_potential_matches: usize,
    pub pending_friend_requests: usize,
    pub accepted_friends: usize,
}

// ============================================================================
// Seed fixtures
// ============================================================================

/// A user plus optional current traits, as found in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(default)]
    pub traits: Option<TraitVector>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedFriendship {
    pub from: UserId,
    pub to: UserId,
    pub status: FriendStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSession {
    pub token: String,
    pub user_id: UserId,
}

/// JSON fixture used to populate a [`MemoryStore`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub friendships: Vec<SeedFriendship>,
    #[serde(default)]
    pub sessions: Vec<SeedSession>,
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Friendship key: the unordered pair, smaller id first.
fn pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Concurrent in-memory relationship store.
pub struct MemoryStore {
    users: DashMap<UserId, UserProfile>,
    /// user -> all quiz results, oldest first
    results: DashMap<UserId, Vec<QuizResult>>,
    friendships: DashMap<(UserId, UserId), Friendship>,
    sessions: DashMap<String, Session>,
    next_user_id: AtomicI64,
    next_result_id: AtomicI64,
    session_ttl: Duration,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("users", &self.users.len())
            .field("friendships", &self.friendships.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_session_ttl(Duration::seconds(DEFAULT_SESSION_TTL_SECONDS))
    }

    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        Self {
            users: DashMap::new(),
            results: DashMap::new(),
            friendships: DashMap::new(),
            sessions: DashMap::new(),
            next_user_id: AtomicI64::new(1),
            next_result_id: AtomicI64::new(1),
            session_ttl,
        }
    }

    /// Build a store from a parsed fixture.
    pub fn from_seed(seed: SeedData, session_ttl: Duration) -> MatchResult<Self> {
        let store = Self::with_session_ttl(session_ttl);
        for user in seed.users {
            let id = store.insert_user(user.profile)?;
            if let Some(traits) = user.traits {
                store.save_results(id, traits, "seed")?;
            }
        }
        for edge in seed.friendships {
            store.put_friendship(edge.from, edge.to, edge.status)?;
        }
        for session in seed.sessions {
            store.user(session.user_id)?;
            let now = Utc::now();
            store.sessions.insert(
                session.token.clone(),
                Session {
                    token: session.token,
                    user_id: session.user_id,
                    created_at: now,
                    expires_at: now + store.session_ttl,
                },
            );
        }
        info!(
            users = store.users.len(),
            friendships = store.friendships.len(),
            "Seeded memory store"
        );
        Ok(store)
    }

    /// Read and parse a JSON fixture file.
    pub async fn load_seed(path: &Path, session_ttl: Duration) -> MatchResult<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MatchError::StorageError(format!("{}: {}", path.display(), e)))?;
        let seed: SeedData = serde_json::from_str(&text)
            .map_err(|e| MatchError::invalid(format!("seed file {}: {}", path.display(), e)))?;
        Self::from_seed(seed, session_ttl)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Register a new account and return its id.
    pub fn register_user(&self, username: impl Into<String>) -> MatchResult<UserId> {
        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst);
        self.insert_user(UserProfile::new(id, username))
    }

    /// Insert a fully specified profile. The id must be unused.
    pub fn insert_user(&self, profile: UserProfile) -> MatchResult<UserId> {
        let id = profile.id;
        match self.users.entry(id) {
            Entry::Occupied(_) => Err(MatchError::conflict(format!("user {} already exists", id))),
            Entry::Vacant(slot) => {
                slot.insert(profile);
                self.next_user_id.fetch_max(id + 1, Ordering::SeqCst);
                Ok(id)
            }
        }
    }

    /// Look up a user that has not been deleted.
    pub fn user(&self, id: UserId) -> MatchResult<UserProfile> {
        self.users
            .get(&id)
            .map(|u| u.value().clone())
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| MatchError::not_found("user", id))
    }

    pub fn set_active(&self, id: UserId, active: bool) -> MatchResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| MatchError::not_found("user", id))?;
        user.is_active = active;
        Ok(())
    }

    /// Soft-delete a user and revoke their sessions.
    pub fn delete_user(&self, id: UserId) -> MatchResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| MatchError::not_found("user", id))?;
        user.is_deleted = true;
        drop(user);
        self.sessions.retain(|_, s| s.user_id != id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn create_session(&self, user_id: UserId) -> MatchResult<Session> {
        let user = self.user(user_id)?;
        if !user.is_active {
            return Err(MatchError::Unauthorized);
        }
        let now = Utc::now();
        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(session)
    }

    /// Resolve a bearer token to an active, non-deleted user.
    pub fn resolve_session(&self, token: &str) -> MatchResult<UserId> {
        let session = self
            .sessions
            .get(token)
            .map(|s| s.value().clone())
            .ok_or(MatchError::Unauthorized)?;
        if session.is_expired() {
            self.sessions.remove(token);
            debug!(user_id = session.user_id, "Session expired");
            return Err(MatchError::Unauthorized);
        }
        match self.user(session.user_id) {
            Ok(user) if user.is_active => Ok(user.id),
            _ => Err(MatchError::Unauthorized),
        }
    }

    pub fn revoke_session(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every expired session; returns how many were removed.
    pub fn cleanup_expired_sessions(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired());
        before - self.sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Sweep expired sessions every `period` until `shutdown` fires or its
    /// sender is dropped.
    pub fn spawn_session_sweeper(
        self: &Arc<Self>,
        period: StdDuration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.cleanup_expired_sessions();
                        if removed > 0 {
                            debug!(removed, "Swept expired sessions");
                        }
                    }
                    _ = shutdown.recv() => {
                        break;
                    }
                }
            }
        })
    }

    // ------------------------------------------------------------------
    // Quiz results
    // ------------------------------------------------------------------

    /// Store a new current result; earlier results stay in the history.
    pub fn save_results(
        &self,
        user_id: UserId,
        traits: TraitVector,
        test_version: impl Into<String>,
    ) -> MatchResult<QuizResult> {
        self.user(user_id)?;
        let result = QuizResult {
            id: self.next_result_id.fetch_add(1, Ordering::SeqCst),
            user_id,
            traits,
            test_version: test_version.into(),
            is_current: true,
            created_at: Utc::now(),
        };
        let mut history = self.results.entry(user_id).or_default();
        for earlier in history.iter_mut() {
            earlier.is_current = false;
        }
        history.push(result.clone());
        debug!(user_id, result_id = result.id, "Saved quiz result");
        Ok(result)
    }

    pub fn current_result(&self, user_id: UserId) -> Option<QuizResult> {
        self.results
            .get(&user_id)
            .and_then(|history| history.iter().find(|r| r.is_current).cloned())
    }

    /// All results for a user, newest first.
    pub fn result_history(&self, user_id: UserId) -> Vec<QuizResult> {
        let mut history = self
            .results
            .get(&user_id)
            .map(|h| h.value().clone())
            .unwrap_or_default();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        history
    }

    /// Delete one of the user's results.
    ///
    /// The only remaining result cannot be deleted. Deleting the current
    /// result promotes the newest remaining one.
    pub fn delete_result(&self, user_id: UserId, result_id: i64) -> MatchResult<()> {
        let mut history = self
            .results
            .get_mut(&user_id)
            .ok_or_else(|| MatchError::not_found("quiz result", result_id))?;
        let position = history
            .iter()
            .position(|r| r.id == result_id)
            .ok_or_else(|| MatchError::not_found("quiz result", result_id))?;
        let was_current = history[position].is_current;
        if was_current && history.len() == 1 {
            return Err(MatchError::conflict("Cannot delete your only quiz result"));
        }
        history.remove(position);
        if was_current {
            if let Some(newest) = history
                .iter_mut()
                .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            {
                newest.is_current = true;
            }
        }
        Ok(())
    }

    pub fn quiz_stats(&self, user_id: UserId) -> QuizStats {
        let history = self.result_history(user_id);
        if history.is_empty() {
            return QuizStats {
                total_tests: 0,
                first_test: None,
                latest_test: None,
                averages: None,
            };
        }
        let count = history.len() as f64;
        let averages = Trait::ALL
            .into_iter()
            .map(|t| {
                let mean = history.iter().map(|r| r.traits.get(t)).sum::<f64>() / count;
                (t.name(), (mean * 10.0).round() / 10.0)
            })
            .collect();
        QuizStats {
            total_tests: history.len(),
            first_test: history.iter().map(|r| r.created_at).min(),
            latest_test: history.iter().map(|r| r.created_at).max(),
            averages: Some(averages),
        }
    }

    // ------------------------------------------------------------------
    // Friendships
    // ------------------------------------------------------------------

    pub fn send_friend_request(&self, from: UserId, to: UserId) -> MatchResult<Friendship> {
        if from == to {
            return Err(MatchError::invalid("cannot send a friend request to yourself"));
        }
        self.user(from)?;
        self.user(to)?;
        match self.friendships.entry(pair(from, to)) {
            Entry::Occupied(existing) => Err(MatchError::conflict(match existing.get().status {
                FriendStatus::Accepted => "Already friends",
                FriendStatus::Pending => "Friend request already sent",
                FriendStatus::Blocked | FriendStatus::None => "Cannot send friend request",
            })),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let edge = Friendship {
                    requested_by: from,
                    addressee: to,
                    status: FriendStatus::Pending,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(edge.clone());
                Ok(edge)
            }
        }
    }

    /// Accept a pending request that `requester` sent to `addressee`.
    pub fn accept_friend_request(&self, addressee: UserId, requester: UserId) -> MatchResult<()> {
        let mut edge = self
            .friendships
            .get_mut(&pair(addressee, requester))
            .filter(|e| e.status == FriendStatus::Pending && e.requested_by == requester)
            .ok_or_else(|| MatchError::not_found("pending friend request", requester))?;
        edge.status = FriendStatus::Accepted;
        edge.updated_at = Utc::now();
        Ok(())
    }

    /// Block `other`, replacing any existing relationship.
    pub fn block_user(&self, user: UserId, other: UserId) -> MatchResult<()> {
        self.put_friendship(user, other, FriendStatus::Blocked)
    }

    /// The edge between two users, if any.
    pub fn friendship(&self, a: UserId, b: UserId) -> Option<Friendship> {
        self.friendships.get(&pair(a, b)).map(|e| e.clone())
    }

    /// Remove a friendship or cancel a request; returns whether one existed.
    pub fn remove_friend(&self, user: UserId, other: UserId) -> bool {
        self.friendships.remove(&pair(user, other)).is_some()
    }

    fn put_friendship(&self, from: UserId, to: UserId, status: FriendStatus) -> MatchResult<()> {
        if from == to {
            return Err(MatchError::invalid("a user cannot befriend themselves"));
        }
        self.user(from)?;
        self.user(to)?;
        let now = Utc::now();
        self.friendships.insert(
            pair(from, to),
            Friendship {
                requested_by: from,
                addressee: to,
                status,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Accepted friends of `user`.
    pub fn friends_of(&self, user: UserId) -> BTreeSet<UserId> {
        self.friendships
            .iter()
            .filter(|e| e.status == FriendStatus::Accepted)
            .filter(|e| e.key().0 == user || e.key().1 == user)
            .map(|e| e.other(user))
            .collect()
    }

    /// Accepted friendships of `user`, most recently created first.
    pub fn accepted_friendships(&self, user: UserId) -> Vec<Friendship> {
        let mut edges: Vec<Friendship> = self
            .friendships
            .iter()
            .filter(|e| e.status == FriendStatus::Accepted)
            .filter(|e| e.key().0 == user || e.key().1 == user)
            .map(|e| e.value().clone())
            .collect();
        edges.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.other(user).cmp(&b.other(user)))
        });
        edges
    }

    // ------------------------------------------------------------------
    // Discovery summary
    // ------------------------------------------------------------------

    pub fn discovery_stats(&self, viewer: UserId) -> DiscoveryStats {
        if self.current_result(viewer).is_none() {
            return DiscoveryStats {
                has_personality_results: false,
                total_potential_matches: 0,
                pending_friend_requests: 0,
                accepted_friends: 0,
            };
        }

        let mut related = BTreeSet::new();
        let mut pending_sent = 0;
        let mut accepted = 0;
        for edge in self.friendships.iter() {
            let (a, b) = *edge.key();
            if a != viewer && b != viewer {
                continue;
            }
            match edge.status {
                FriendStatus::Accepted => {
                    accepted += 1;
                    related.insert(edge.other(viewer));
                }
                FriendStatus::Pending => {
                    if edge.requested_by == viewer {
                        pending_sent += 1;
                    }
                    related.insert(edge.other(viewer));
                }
                FriendStatus::Blocked | FriendStatus::None => {}
            }
        }

        let potential = self
            .candidate_ids(viewer, &CandidateFilter::default(), Utc::now())
            .into_iter()
            .filter(|id| !related.contains(id))
            .count();

        DiscoveryStats {
            has_personality_results: true,
            total_potential_matches: potential,
            pending_friend_requests: pending_sent,
            accepted_friends: accepted,
        }
    }

    /// Ids of eligible candidates in ascending order.
    fn candidate_ids(
        &self,
        viewer: UserId,
        filter: &CandidateFilter,
        now: DateTime<Utc>,
    ) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self
            .users
            .iter()
            .filter(|u| u.id != viewer && u.is_discoverable())
            .filter(|u| filter.matches(u.value(), now))
            .map(|u| u.id)
            .filter(|id| self.current_result(*id).is_some())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn current_traits(&self, user: UserId) -> MatchResult<Option<TraitVector>> {
        Ok(self.current_result(user).map(|r| r.traits))
    }

    async fn eligible_candidates(
        &self,
        viewer: UserId,
        filter: &CandidateFilter,
    ) -> MatchResult<CandidatePool> {
        let ids = self.candidate_ids(viewer, filter, Utc::now());
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                self.current_result(id)
                    .map(|r| Candidate::new(id, r.traits.to_raw()))
            })
            .collect())
    }

    async fn friend_status(&self, a: UserId, b: UserId) -> MatchResult<FriendStatus> {
        Ok(self
            .friendships
            .get(&pair(a, b))
            .map(|e| e.status)
            .unwrap_or_default())
    }

    async fn mutual_friend_count(&self, a: UserId, b: UserId) -> MatchResult<usize> {
        let theirs = self.friends_of(b);
        Ok(self
            .friends_of(a)
            .intersection(&theirs)
            .count())
    }
}
