/// HTTP API for friend-finder.
///
/// This module exposes discovery, quiz results and friendship status over a
/// JSON interface backed by a [`MemoryStore`]. Every route requires an
/// `Authorization: Bearer <token>` header naming a live session.
///
/// # Example
///
/// ```ignore
/// use friend_finder::http::HttpServer;
///
/// let store = Arc::new(MemoryStore::new());
/// let server = HttpServer::new(store, ServerConfig::default());
/// server.bind().await?;
/// ```
///
/// # API Endpoints
///
/// ## Discovery
/// - `GET /api/discover/compatible-users` - Ranked, filtered, paginated matches
/// - `GET /api/discover/stats` - Match and friendship counts
/// - `GET /api/discover/personality-insights` - Ideal ranges and tips
///
/// ## Quiz
/// - `POST /api/quiz/save-results` - Store a new current result
/// - `GET /api/quiz/my-results` - Current result
/// - `GET /api/quiz/history` - All results, newest first
/// - `GET /api/quiz/stats` - Aggregate over the history
/// - `DELETE /api/quiz/results/:result_id` - Delete one result
///
/// ## Friends
/// - `POST /api/friends/request` - Send a friend request
/// - `POST /api/friends/accept/:user_id` - Accept a pending request from a user
/// - `DELETE /api/friends/remove/:user_id` - Remove a friend or cancel a request
/// - `GET /api/friends/list` - Accepted friends, newest first
/// - `GET /api/friends/status/:user_id` - Relationship with another user
///
/// ## Users
/// - `GET /api/users/:user_id` - Public profile with friend count and traits
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::discovery::{
    CompatibilityRecord, DiscoveryFilters, DiscoveryPage, DiscoveryPipeline, PageRequest,
    PersonalityInsights, personality_insights,
};
use crate::error::{MatchError, MatchResult};
use crate::store::{AgeBucket, CandidateFilter, DiscoveryStats, MemoryStore, QuizResult, QuizStats};
use crate::types::{FriendStatus, TraitVector, UserId, UserProfile};

/// HTTP server for friend-finder.
pub struct HttpServer {
    store: Arc<MemoryStore>,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server over the given store.
    pub fn new(store: Arc<MemoryStore>, config: ServerConfig) -> Self {
        Self { store, config }
    }

    /// Serve on the configured address until the process exits.
    pub async fn bind(self) -> MatchResult<()> {
        self.serve_until(std::future::pending()).await
    }

    /// Serve on the configured address until `shutdown` resolves.
    ///
    /// Expired sessions are swept in the background while the server runs.
    pub async fn serve_until<F>(self, shutdown: F) -> MatchResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.bind_addr;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| MatchError::StorageError(format!("Failed to bind {}: {}", addr, e)))?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let sweeper = self
            .store
            .spawn_session_sweeper(self.config.session_cleanup_interval, shutdown_rx);
        let app = create_router(self.store, self.config);

        info!(%addr, "HTTP API listening");
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| MatchError::StorageError(format!("Server error: {}", e)));

        let _ = shutdown_tx.send(());
        if let Err(e) = sweeper.await {
            error!(error = %e, "Session sweeper failed");
        }
        served?;

        info!("HTTP API stopped");
        Ok(())
    }
}

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    store: Arc<MemoryStore>,
    pipeline: DiscoveryPipeline<MemoryStore>,
    config: Arc<ServerConfig>,
}

impl AppState {
    fn page_request(&self, page: Option<usize>, limit: Option<usize>) -> MatchResult<PageRequest> {
        let limit = limit.unwrap_or(self.config.default_page_limit);
        if limit > self.config.max_page_limit {
            return Err(MatchError::invalid(format!(
                "limit must be between 1 and {}",
                self.config.max_page_limit
            )));
        }
        PageRequest::new(page.unwrap_or(1), limit)
    }
}

/// Create the Axum router with all routes.
pub fn create_router(store: Arc<MemoryStore>, config: ServerConfig) -> Router {
    use axum::routing::{delete, get, post};

    let state = AppState {
        pipeline: DiscoveryPipeline::new(Arc::clone(&store)),
        store,
        config: Arc::new(config),
    };

    Router::new()
        // Discovery
        .route("/api/discover/compatible-users", get(handle_compatible_users))
        .route("/api/discover/stats", get(handle_discover_stats))
        .route("/api/discover/personality-insights", get(handle_personality_insights))
        // Quiz
        .route("/api/quiz/save-results", post(handle_save_results))
        .route("/api/quiz/my-results", get(handle_my_results))
        .route("/api/quiz/history", get(handle_history))
        .route("/api/quiz/stats", get(handle_quiz_stats))
        .route("/api/quiz/results/:result_id", delete(handle_delete_result))
        // Friends
        .route("/api/friends/request", post(handle_friend_request))
        .route("/api/friends/accept/:user_id", post(handle_accept_friend))
        .route("/api/friends/remove/:user_id", delete(handle_remove_friend))
        .route("/api/friends/list", get(handle_friends_list))
        .route("/api/friends/status/:user_id", get(handle_friend_status))
        // Users
        .route("/api/users/:user_id", get(handle_user_profile))
        .with_state(state)
}

// ============================================================================
// Errors and auth
// ============================================================================

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for MatchError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            MatchError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            MatchError::MissingAssessment => (StatusCode::BAD_REQUEST, "MISSING_ASSESSMENT"),
            MatchError::Conflict { .. } => (StatusCode::BAD_REQUEST, "CONFLICT"),
            MatchError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            MatchError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            MatchError::StorageError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let message = match &self {
            MatchError::StorageError(detail) => {
                error!(%detail, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorResponse {
                error: message,
                code,
            }),
        )
            .into_response()
    }
}

/// Resolve the bearer token to the calling user.
fn require_user(headers: &HeaderMap, store: &MemoryStore) -> MatchResult<UserId> {
    let token = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(MatchError::Unauthorized)?;
    store.resolve_session(token.trim())
}

// ============================================================================
// Discovery
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct DiscoverParams {
    page: Option<usize>,
    limit: Option<usize>,
    search: Option<String>,
    age_range: Option<String>,
    min_compatibility: Option<String>,
}

impl DiscoverParams {
    fn filters(&self) -> MatchResult<DiscoveryFilters> {
        let mut candidates = CandidateFilter::new();
        if let Some(search) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            candidates = candidates.search(search);
        }
        if let Some(bucket) = self
            .age_range
            .as_deref()
            .map(AgeBucket::parse_filter)
            .transpose()?
            .flatten()
        {
            candidates = candidates.age_bucket(bucket);
        }

        let mut filters = DiscoveryFilters::new().candidates(candidates);
        if let Some(min) = self
            .min_compatibility
            .as_deref()
            .map(DiscoveryFilters::parse_min_compatibility)
            .transpose()?
            .flatten()
        {
            filters = filters.min_compatibility(min);
        }
        Ok(filters)
    }
}

/// A ranked candidate with the profile fields a client renders.
#[derive(Debug, Serialize)]
struct CompatibleUser {
    id: UserId,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    personality_results: TraitVector,
    compatibility_score: f64,
    distance: f64,
    friend_status: FriendStatus,
    mutual_friends: usize,
}

impl CompatibleUser {
    fn new(profile: UserProfile, traits: TraitVector, record: &CompatibilityRecord) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            bio: profile.bio,
            avatar_url: profile.avatar_url,
            created_at: profile.created_at,
            personality_results: traits,
            compatibility_score: record.compatibility_score,
            distance: record.distance,
            friend_status: record.friend_status,
            mutual_friends: record.mutual_friend_count,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompatibleUsersResponse {
    users: Vec<CompatibleUser>,
    total_count: usize,
    page: usize,
    limit: usize,
    has_more: bool,
    skipped_candidates: usize,
}

async fn handle_compatible_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DiscoverParams>,
) -> Result<Json<CompatibleUsersResponse>, MatchError> {
    let viewer = require_user(&headers, &state.store)?;
    let request = state.page_request(params.page, params.limit)?;
    let filters = params.filters()?;

    let page = state.pipeline.discover_for(viewer, &filters, request).await?;
    Ok(Json(render_page(&state.store, viewer, page)))
}

/// Attach profiles to a ranked page.
///
/// A candidate deleted or reset after ranking is left out of `users` and
/// counted as skipped, and `total_count` no longer includes it.
fn render_page(store: &MemoryStore, viewer: UserId, page: DiscoveryPage) -> CompatibleUsersResponse {
    let mut users = Vec::with_capacity(page.records.len());
    for record in &page.records {
        let id = record.candidate_id;
        let (Ok(profile), Some(result)) = (store.user(id), store.current_result(id)) else {
            debug!(viewer, candidate = id, "Candidate disappeared while rendering page");
            continue;
        };
        users.push(CompatibleUser::new(profile, result.traits, record));
    }

    let vanished = page.records.len() - users.len();
    CompatibleUsersResponse {
        users,
        total_count: page.total_count - vanished,
        page: page.page,
        limit: page.limit,
        has_more: page.has_more,
        skipped_candidates: page.warnings.skipped.len() + vanished,
    }
}

async fn handle_discover_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DiscoveryStats>, MatchError> {
    let viewer = require_user(&headers, &state.store)?;
    Ok(Json(state.store.discovery_stats(viewer)))
}

async fn handle_personality_insights(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PersonalityInsights>, MatchError> {
    let viewer = require_user(&headers, &state.store)?;
    let result = state
        .store
        .current_result(viewer)
        .ok_or(MatchError::MissingAssessment)?;
    Ok(Json(personality_insights(&result.traits)))
}

// ============================================================================
// Quiz
// ============================================================================

fn default_test_version() -> String {
    "1.0".to_string()
}

/// Request body for POST /api/quiz/save-results
#[derive(Debug, Deserialize)]
struct SaveResultsRequest {
    extraversion: f64,
    agreeableness: f64,
    conscientiousness: f64,
    emotional_stability: f64,
    intellect_imagination: f64,
    #[serde(default = "default_test_version")]
    test_version: String,
}

impl SaveResultsRequest {
    fn traits(&self) -> MatchResult<TraitVector> {
        TraitVector::new([
            self.extraversion,
            self.agreeableness,
            self.conscientiousness,
            self.emotional_stability,
            self.intellect_imagination,
        ])
    }
}

#[derive(Debug, Serialize)]
struct SaveResultsResponse {
    success: bool,
    message: &'static str,
    result_id: i64,
}

/// A stored result as clients see it: scores flattened beside the metadata.
#[derive(Debug, Serialize)]
struct ResultBody {
    id: i64,
    #[serde(flatten)]
    traits: TraitVector,
    test_version: String,
    is_current: bool,
    created_at: DateTime<Utc>,
}

impl From<QuizResult> for ResultBody {
    fn from(result: QuizResult) -> Self {
        Self {
            id: result.id,
            traits: result.traits,
            test_version: result.test_version,
            is_current: result.is_current,
            created_at: result.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct MyResultsResponse {
    success: bool,
    results: Option<ResultBody>,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    success: bool,
    history: Vec<ResultBody>,
    total_tests: usize,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    success: bool,
    stats: QuizStats,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

async fn handle_save_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SaveResultsRequest>,
) -> Result<Json<SaveResultsResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    let traits = request.traits()?;
    let saved = state.store.save_results(user, traits, request.test_version)?;
    info!(user, result_id = saved.id, "Quiz results saved");
    Ok(Json(SaveResultsResponse {
        success: true,
        message: "Quiz results saved successfully",
        result_id: saved.id,
    }))
}

async fn handle_my_results(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MyResultsResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    let response = match state.store.current_result(user) {
        Some(result) => MyResultsResponse {
            success: true,
            results: Some(result.into()),
            message: "Results retrieved successfully",
        },
        None => MyResultsResponse {
            success: true,
            results: None,
            message: "No quiz results found",
        },
    };
    Ok(Json(response))
}

async fn handle_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    let history: Vec<ResultBody> = state
        .store
        .result_history(user)
        .into_iter()
        .map(ResultBody::from)
        .collect();
    Ok(Json(HistoryResponse {
        success: true,
        total_tests: history.len(),
        history,
    }))
}

async fn handle_quiz_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    Ok(Json(StatsResponse {
        success: true,
        stats: state.store.quiz_stats(user),
    }))
}

async fn handle_delete_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(result_id): Path<i64>,
) -> Result<Json<MessageResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    state.store.delete_result(user, result_id)?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Quiz result deleted successfully",
    }))
}

// ============================================================================
// Friends
// ============================================================================

/// Default and largest size of the friends list.
const DEFAULT_FRIENDS_LIMIT: usize = 50;
const MAX_FRIENDS_LIMIT: usize = 100;

/// Request body for POST /api/friends/request
#[derive(Debug, Deserialize)]
struct FriendRequestBody {
    friend_user_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
struct FriendsListParams {
    limit: Option<usize>,
}

/// One accepted friend in the list.
#[derive(Debug, Serialize)]
struct FriendEntry {
    id: UserId,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    avatar_url: Option<String>,
    friend_since: DateTime<Utc>,
}

async fn handle_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<FriendRequestBody>,
) -> Result<Json<MessageResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    state.store.send_friend_request(user, request.friend_user_id)?;
    info!(user, to = request.friend_user_id, "Friend request sent");
    Ok(Json(MessageResponse {
        success: true,
        message: "Friend request sent",
    }))
}

async fn handle_accept_friend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(requester): Path<UserId>,
) -> Result<Json<MessageResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    state.store.accept_friend_request(user, requester)?;
    info!(user, requester, "Friend request accepted");
    Ok(Json(MessageResponse {
        success: true,
        message: "Friend request accepted",
    }))
}

async fn handle_remove_friend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(other): Path<UserId>,
) -> Result<Json<MessageResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    if !state.store.remove_friend(user, other) {
        debug!(user, other, "No friendship to remove");
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "Friend removed",
    }))
}

async fn handle_friends_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FriendsListParams>,
) -> Result<Json<Vec<FriendEntry>>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    let limit = params.limit.unwrap_or(DEFAULT_FRIENDS_LIMIT);
    if !(1..=MAX_FRIENDS_LIMIT).contains(&limit) {
        return Err(MatchError::invalid(format!(
            "limit must be between 1 and {}",
            MAX_FRIENDS_LIMIT
        )));
    }

    let friends = state
        .store
        .accepted_friendships(user)
        .into_iter()
        .filter_map(|edge| {
            let profile = state.store.user(edge.other(user)).ok()?;
            Some(FriendEntry {
                id: profile.id,
                username: profile.username,
                first_name: profile.first_name,
                last_name: profile.last_name,
                avatar_url: profile.avatar_url,
                friend_since: edge.created_at,
            })
        })
        .take(limit)
        .collect();
    Ok(Json(friends))
}

#[derive(Debug, Serialize)]
struct FriendStatusResponse {
    status: FriendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested_by: Option<UserId>,
}

async fn handle_friend_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(other): Path<UserId>,
) -> Result<Json<FriendStatusResponse>, MatchError> {
    let user = require_user(&headers, &state.store)?;
    let response = match state.store.friendship(user, other) {
        Some(edge) => FriendStatusResponse {
            status: edge.status,
            requested_by: Some(edge.requested_by),
        },
        None => FriendStatusResponse {
            status: FriendStatus::None,
            requested_by: None,
        },
    };
    Ok(Json(response))
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Serialize)]
struct UserProfileResponse {
    id: UserId,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    friend_count: usize,
    personality_results: Option<TraitVector>,
}

async fn handle_user_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfileResponse>, MatchError> {
    require_user(&headers, &state.store)?;
    let profile = state.store.user(id)?;
    Ok(Json(UserProfileResponse {
        friend_count: state.store.friends_of(id).len(),
        personality_results: state.store.current_result(id).map(|r| r.traits),
        id: profile.id,
        username: profile.username,
        first_name: profile.first_name,
        last_name: profile.last_name,
        bio: profile.bio,
        avatar_url: profile.avatar_url,
        is_active: profile.is_active,
        created_at: profile.created_at,
    }))
}
