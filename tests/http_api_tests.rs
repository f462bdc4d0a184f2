/// Integration tests for the HTTP API.
///
/// The router is driven in-process with `tower::ServiceExt::oneshot`, so no
/// port is bound.
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use friend_finder::http::create_router;
use friend_finder::{MemoryStore, ServerConfig, TraitVector, UserProfile};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    fn with_config(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = create_router(Arc::clone(&store), config);
        Self { router, store }
    }

    /// Register a user and return a bearer token for them.
    fn login(&self, id: i64, name: &str) -> String {
        self.store
            .insert_user(UserProfile::new(id, name).with_name(name, "Tester"))
            .unwrap();
        self.store.create_session(id).unwrap().token
    }

    fn save(&self, id: i64, values: [f64; 5]) {
        self.store
            .save_results(id, TraitVector::new(values).unwrap(), "1.0")
            .unwrap();
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let app = TestApp::new();
    let (status, body) = app
        .request(Method::GET, "/api/discover/stats", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/api/discover/stats", "not-a-session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoked_session_rejected() {
    let app = TestApp::new();
    let token = app.login(1, "alice");
    assert!(app.store.revoke_session(&token));
    let (status, _) = app.get("/api/quiz/my-results", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_discover_without_results_is_bad_request() {
    let app = TestApp::new();
    let token = app.login(1, "alice");
    let (status, body) = app.get("/api/discover/compatible-users", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "You need to complete the personality assessment first"
    );

    let (status, _) = app.get("/api/discover/personality-insights", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compatible_users_response() {
    let app = TestApp::new();
    let token = app.login(1, "alice");
    app.save(1, [80.0, 50.0, 70.0, 60.0, 40.0]);
    app.login(2, "bob");
    app.save(2, [50.0, 60.0, 70.0, 60.0, 60.0]);
    app.login(3, "carol");
    app.save(3, [10.0, 10.0, 10.0, 10.0, 10.0]);
    app.store.send_friend_request(1, 3).unwrap();

    let (status, body) = app.get("/api/discover/compatible-users", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["has_more"], false);

    let users = body["users"].as_array().unwrap();
    assert_eq!(users[0]["id"], 2);
    assert_eq!(users[0]["username"], "bob");
    assert_eq!(users[0]["compatibility_score"], 100.0);
    assert_eq!(users[0]["personality_results"]["agreeableness"], 60.0);
    assert_eq!(users[0]["friend_status"], "none");
    assert_eq!(users[1]["id"], 3);
    assert_eq!(users[1]["friend_status"], "pending");
}

#[tokio::test]
async fn test_compatible_users_query_params() {
    let app = TestApp::new();
    let token = app.login(1, "alice");
    app.save(1, [50.0; 5]);
    for id in 2..=26 {
        app.login(id, &format!("user{}", id));
        app.save(id, [50.0 + (id - 2) as f64, 50.0, 50.0, 50.0, 50.0]);
    }

    let (status, body) = app
        .get("/api/discover/compatible-users?page=2&limit=20", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 25);
    assert_eq!(body["users"].as_array().unwrap().len(), 5);
    assert_eq!(body["has_more"], false);

    let (_, body) = app
        .get("/api/discover/compatible-users?min_compatibility=90", &token)
        .await;
    assert_eq!(body["total_count"], 23);

    let (_, body) = app
        .get(
            "/api/discover/compatible-users?search=USER2&age_range=all&min_compatibility=all",
            &token,
        )
        .await;
    // user2 and user20..=user26
    assert_eq!(body["total_count"], 8);

    for bad in [
        "?page=0",
        "?limit=0",
        "?limit=101",
        "?age_range=teens",
        "?min_compatibility=high",
    ] {
        let uri = format!("/api/discover/compatible-users{}", bad);
        let (status, _) = app.get(&uri, &token).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", bad);
    }
}

#[tokio::test]
async fn test_configured_page_limits() {
    let app = TestApp::with_config(ServerConfig::new().max_page_limit(10));
    let token = app.login(1, "alice");
    app.save(1, [50.0; 5]);
    for id in 2..=13 {
        app.login(id, &format!("user{}", id));
        app.save(id, [40.0; 5]);
    }

    let (_, body) = app.get("/api/discover/compatible-users", &token).await;
    assert_eq!(body["limit"], 10);
    assert_eq!(body["users"].as_array().unwrap().len(), 10);
    assert_eq!(body["has_more"], true);

    let (status, _) = app
        .get("/api/discover/compatible-users?limit=11", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quiz_results_lifecycle() {
    let app = TestApp::new();
    let token = app.login(1, "alice");

    let (status, body) = app.get("/api/quiz/my-results", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], Value::Null);

    let scores = json!({
        "extraversion": 70.0,
        "agreeableness": 60.0,
        "conscientiousness": 50.0,
        "emotional_stability": 40.0,
        "intellect_imagination": 30.0
    });
    let (status, body) = app
        .request(Method::POST, "/api/quiz/save-results", Some(&token), Some(scores))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let first_id = body["result_id"].as_i64().unwrap();

    let second = json!({
        "extraversion": 75.0,
        "agreeableness": 65.0,
        "conscientiousness": 55.0,
        "emotional_stability": 45.0,
        "intellect_imagination": 35.0,
        "test_version": "2.0"
    });
    let (_, body) = app
        .request(Method::POST, "/api/quiz/save-results", Some(&token), Some(second))
        .await;
    let second_id = body["result_id"].as_i64().unwrap();

    let (_, body) = app.get("/api/quiz/my-results", &token).await;
    assert_eq!(body["results"]["id"], second_id);
    assert_eq!(body["results"]["extraversion"], 75.0);
    assert_eq!(body["results"]["test_version"], "2.0");

    let (_, body) = app.get("/api/quiz/history", &token).await;
    assert_eq!(body["total_tests"], 2);
    assert_eq!(body["history"][0]["id"], second_id);
    assert_eq!(body["history"][1]["is_current"], false);

    let (_, body) = app.get("/api/quiz/stats", &token).await;
    assert_eq!(body["stats"]["total_tests"], 2);
    assert_eq!(body["stats"]["averages"]["extraversion"], 72.5);

    let uri = format!("/api/quiz/results/{}", second_id);
    let (status, _) = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/quiz/my-results", &token).await;
    assert_eq!(body["results"]["id"], first_id);

    // The only remaining result cannot be deleted.
    let uri = format!("/api/quiz/results/{}", first_id);
    let (status, body) = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app
        .request(Method::DELETE, "/api/quiz/results/9999", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_results_rejects_out_of_range() {
    let app = TestApp::new();
    let token = app.login(1, "alice");
    let scores = json!({
        "extraversion": 170.0,
        "agreeableness": 60.0,
        "conscientiousness": 50.0,
        "emotional_stability": 40.0,
        "intellect_imagination": 30.0
    });
    let (status, body) = app
        .request(Method::POST, "/api/quiz/save-results", Some(&token), Some(scores))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(app.store.current_result(1).is_none());
}

#[tokio::test]
async fn test_discover_stats_and_insights() {
    let app = TestApp::new();
    let token = app.login(1, "alice");

    let (_, body) = app.get("/api/discover/stats", &token).await;
    assert_eq!(body["has_personality_results"], false);

    app.save(1, [80.0, 75.0, 50.0, 90.0, 10.0]);
    for id in 2..=4 {
        app.login(id, &format!("user{}", id));
        app.save(id, [50.0; 5]);
    }
    app.store.send_friend_request(1, 2).unwrap();
    app.store.send_friend_request(3, 1).unwrap();
    app.store.accept_friend_request(1, 3).unwrap();

    let (_, body) = app.get("/api/discover/stats", &token).await;
    assert_eq!(body["has_personality_results"], true);
    assert_eq!(body["total_potential_matches"], 1);
    assert_eq!(body["pending_friend_requests"], 1);
    assert_eq!(body["accepted_friends"], 1);

    let (status, body) = app.get("/api/discover/personality-insights", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ideal_match_ranges"]["extraversion"]["min"], 55.0);
    assert_eq!(body["ideal_match_ranges"]["extraversion"]["max"], 100.0);
    assert_eq!(body["ideal_match_ranges"]["intellect_imagination"]["min"], 0.0);
    assert_eq!(body["compatibility_tips"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_friend_status_route() {
    let app = TestApp::new();
    let token = app.login(1, "alice");
    app.login(2, "bob");

    let (status, body) = app.get("/api/friends/status/2", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "none"}));

    app.store.send_friend_request(2, 1).unwrap();
    let (_, body) = app.get("/api/friends/status/2", &token).await;
    assert_eq!(body, json!({"status": "pending", "requested_by": 2}));
}

#[tokio::test]
async fn test_friend_request_accept_remove() {
    let app = TestApp::new();
    let alice = app.login(1, "alice");
    let bob = app.login(2, "bob");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/friends/request",
            Some(&alice),
            Some(json!({"friend_user_id": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Friend request sent");

    // A pending edge blocks a second request from either side.
    for (token, other) in [(&alice, 2), (&bob, 1)] {
        let (status, body) = app
            .request(
                Method::POST,
                "/api/friends/request",
                Some(token),
                Some(json!({"friend_user_id": other})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Friend request already sent"));
    }

    // Only the addressee can accept.
    let (status, _) = app
        .request(Method::POST, "/api/friends/accept/2", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(Method::POST, "/api/friends/accept/1", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Friend request accepted");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/friends/request",
            Some(&alice),
            Some(json!({"friend_user_id": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Already friends"));

    let (_, body) = app.get("/api/friends/status/2", &alice).await;
    assert_eq!(body, json!({"status": "accepted", "requested_by": 1}));

    let (status, body) = app
        .request(Method::DELETE, "/api/friends/remove/2", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Friend removed");
    let (_, body) = app.get("/api/friends/status/1", &bob).await;
    assert_eq!(body, json!({"status": "none"}));

    // Removing again is still a success.
    let (status, _) = app
        .request(Method::DELETE, "/api/friends/remove/2", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_friend_request_rejects_unknown_and_self() {
    let app = TestApp::new();
    let alice = app.login(1, "alice");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/friends/request",
            Some(&alice),
            Some(json!({"friend_user_id": 99})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/friends/request",
            Some(&alice),
            Some(json!({"friend_user_id": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(Method::POST, "/api/friends/accept/5", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_friends_list_newest_first() {
    let app = TestApp::new();
    let alice = app.login(1, "alice");
    let bob = app.login(2, "bob");
    let carol = app.login(3, "carol");
    app.login(4, "dave");

    for other in [2, 3, 4] {
        app.store.send_friend_request(1, other).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    for token in [&bob, &carol] {
        let (status, _) = app
            .request(Method::POST, "/api/friends/accept/1", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.get("/api/friends/list", &alice).await;
    assert_eq!(status, StatusCode::OK);
    let friends = body.as_array().unwrap();
    assert_eq!(friends.len(), 2);
    assert_eq!(friends[0]["id"], 3);
    assert_eq!(friends[0]["username"], "carol");
    assert_eq!(friends[1]["id"], 2);
    assert!(friends[1]["friend_since"].is_string());

    let (_, body) = app.get("/api/friends/list?limit=1", &alice).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], 3);

    for bad in ["?limit=0", "?limit=101"] {
        let uri = format!("/api/friends/list{}", bad);
        let (status, _) = app.get(&uri, &alice).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", bad);
    }

    // Deleted accounts drop out of the list.
    app.store.delete_user(3).unwrap();
    let (_, body) = app.get("/api/friends/list", &alice).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], 2);
}

#[tokio::test]
async fn test_friend_routes_feed_discovery() {
    let app = TestApp::new();
    let alice = app.login(1, "alice");
    let bob = app.login(2, "bob");
    let carol = app.login(3, "carol");
    for id in 1..=3 {
        app.save(id, [50.0 + id as f64; 5]);
    }

    // alice and bob both befriend carol.
    for token in [&alice, &bob] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/friends/request",
                Some(token),
                Some(json!({"friend_user_id": 3})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    for requester in [1, 2] {
        let uri = format!("/api/friends/accept/{}", requester);
        let (status, _) = app.request(Method::POST, &uri, Some(&carol), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app.get("/api/discover/compatible-users", &alice).await;
    let users = body["users"].as_array().unwrap();
    assert_eq!(users[0]["id"], 2);
    assert_eq!(users[0]["friend_status"], "none");
    assert_eq!(users[0]["mutual_friends"], 1);
    assert_eq!(users[1]["id"], 3);
    assert_eq!(users[1]["friend_status"], "accepted");
}

#[tokio::test]
async fn test_user_profile_route() {
    let app = TestApp::new();
    let alice = app.login(1, "alice");
    app.login(2, "bob");

    let (status, body) = app.get("/api/users/2", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bob");
    assert_eq!(body["first_name"], "bob");
    assert_eq!(body["friend_count"], 0);
    assert_eq!(body["personality_results"], Value::Null);

    app.save(2, [40.0; 5]);
    app.store.send_friend_request(1, 2).unwrap();
    app.store.accept_friend_request(2, 1).unwrap();
    let (_, body) = app.get("/api/users/2", &alice).await;
    assert_eq!(body["friend_count"], 1);
    assert_eq!(body["personality_results"]["extraversion"], 40.0);

    let (status, _) = app.get("/api/users/99", &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(Method::GET, "/api/users/2", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
