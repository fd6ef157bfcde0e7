use axum::body::Body;
use axum::Router;
use chrono::{Duration, Utc};
use foodshare::db::{create_pool, run_migrations};
use foodshare::{build_router, AppState, Config};
use http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("api.db").display());
        let pool = create_pool(&url, 5).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let config = Config {
            database_url: url,
            db_max_connections: 5,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_ttl_hours: 1,
        };

        Self {
            router: build_router(AppState::new(pool, config)),
            _dir: dir,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn put(&self, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), body).await
    }

    /// Returns `(token, user_id)`.
    async fn register(&self, name: &str, email: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": "secret123",
                    "city": "Springfield"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn list_food(&self, token: &str, title: &str, amount: i64) -> String {
        let (status, body) = self.post("/api/food", token, food_body(title, amount)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn request_food(&self, token: &str, food_id: &str) -> String {
        let (status, body) = self
            .post("/api/requests", token, json!({ "food": food_id, "message": "Please!" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

fn food_body(title: &str, amount: i64) -> Value {
    food_body_at(title, amount, [-122.4194, 37.7749])
}

/// `coordinates` is `[longitude, latitude]`.
fn food_body_at(title: &str, amount: i64, coordinates: [f64; 2]) -> Value {
    json!({
        "title": title,
        "description": "Freshly picked this morning, still crisp",
        "category": "fruits",
        "quantity": { "amount": amount, "unit": "pounds" },
        "location": { "coordinates": coordinates, "address": "1 Market Street" },
        "availability": { "availableUntil": (Utc::now() + Duration::days(2)).to_rfc3339() },
        "dietary": { "isVegan": true }
    })
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("Dana Donor", "dana@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Dana Again", "email": "DANA@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "dana@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "dana@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].is_string());

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["email"], "dana@example.com");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token, authorization denied");

    let (status, body) = app.get("/api/auth/me", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token is not valid");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Al", "email": "nope", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[tokio::test]
async fn test_food_create_browse_and_filters() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("Dana Donor", "dana@example.com").await;
    let food_id = app.list_food(&token, "Crisp apples", 5).await;

    let (status, body) = app.get(&format!("/api/food/{}", food_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "available");
    assert_eq!(body["data"]["views"], 1);
    assert_eq!(body["data"]["donor"]["id"], user_id.as_str());

    let (_, body) = app.get("/api/food", None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["limit"], 12);

    let (_, body) = app.get("/api/food?category=dairy", None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (_, body) = app.get("/api/food?search=apples&isVegan=true", None).await;
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = app.get("/api/food?city=Springfield", None).await;
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = app.get("/api/food?lat=37.78&lng=-122.41&radius=5", None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert!(body["data"][0]["distanceKm"].as_f64().unwrap() < 5.0);

    let (_, body) = app.get("/api/food?lat=40.71&lng=-74.0&radius=50", None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, body) = app.get("/api/food?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "limit");

    let (status, body) = app.get("/api/food?page=9223372036854775807", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "page");

    let (status, body) = app.get("/api/food/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let (status, _) = app
        .get("/api/food/00000000-0000-0000-0000-000000000000", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post("/api/food", &token, json!({ "title": "Hi", "category": "candy" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"].as_array().unwrap().len() >= 3);

    let (status, _) = app.call(Method::POST, "/api/food", None, Some(food_body("Crisp apples", 1))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_is_owner_only() {
    let app = TestApp::new().await;
    let (donor, _) = app.register("Dana Donor", "dana@example.com").await;
    let (other, _) = app.register("Olly Other", "olly@example.com").await;
    let food_id = app.list_food(&donor, "Crisp apples", 5).await;
    let uri = format!("/api/food/{}", food_id);

    let (status, _) = app.put(&uri, &other, Some(json!({ "title": "Stolen apples" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&uri, &donor, Some(json!({ "title": "Very crisp apples", "category": "dairy" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Very crisp apples");
    assert_eq!(body["data"]["category"], "fruits");

    let (status, _) = app.put(&uri, &donor, Some(json!({ "title": "Hm" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(&uri, &donor, Some(json!({ "notes": "  Ring the side bell  " })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notes"], "Ring the side bell");

    let (status, body) = app
        .put(&uri, &donor, Some(json!({ "notes": "x".repeat(501) })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "notes");
    assert_eq!(body["errors"][0]["message"], "notes must be at most 500 characters");

    // Blank notes leave the stored value alone.
    let (_, body) = app.put(&uri, &donor, Some(json!({ "notes": "   " }))).await;
    assert_eq!(body["data"]["notes"], "Ring the side bell");
}

#[tokio::test]
async fn test_accept_reserves_and_declines_siblings() {
    let app = TestApp::new().await;
    let (donor, _) = app.register("Dana Donor", "dana@example.com").await;
    let (alice, alice_id) = app.register("Alice Asker", "alice@example.com").await;
    let (bob, _) = app.register("Bob Asker", "bob@example.com").await;
    let (carol, _) = app.register("Carol Late", "carol@example.com").await;

    let food_id = app.list_food(&donor, "Crisp apples", 5).await;
    let r1 = app.request_food(&alice, &food_id).await;
    let r2 = app.request_food(&bob, &food_id).await;

    let (status, body) = app.get("/api/requests/received", Some(&donor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["limit"], 10);

    let (status, _) = app.put(&format!("/api/requests/{}/accept", r1), &alice, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.put(&format!("/api/requests/{}/accept", r1), &donor, None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "accepted");
    assert_eq!(body["data"]["food"]["status"], "reserved");

    let (_, body) = app.get(&format!("/api/requests/{}", r2), Some(&bob)).await;
    assert_eq!(body["data"]["status"], "declined");

    let (_, body) = app.get(&format!("/api/food/{}", food_id), None).await;
    assert_eq!(body["data"]["status"], "reserved");
    assert_eq!(body["data"]["reservedBy"], alice_id.as_str());

    let (status, _) = app.put(&format!("/api/requests/{}/accept", r1), &donor, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.put(&format!("/api/requests/{}/accept", r2), &donor, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.put(&format!("/api/requests/{}/decline", r2), &donor, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/food/{}", food_id);
    let (status, _) = app.put(&uri, &donor, Some(json!({ "title": "Changed my mind" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.call(Method::DELETE, &uri, Some(&donor), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/api/requests", &carol, json!({ "food": food_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Food item is not available");

    let (_, body) = app.get("/api/food", None).await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_concurrent_accepts_reserve_once() {
    let app = TestApp::new().await;
    let (donor, _) = app.register("Dana Donor", "dana@example.com").await;
    let (alice, _) = app.register("Alice Asker", "alice@example.com").await;
    let (bob, _) = app.register("Bob Asker", "bob@example.com").await;

    let food_id = app.list_food(&donor, "Crisp apples", 5).await;
    let r1 = app.request_food(&alice, &food_id).await;
    let r2 = app.request_food(&bob, &food_id).await;

    let uri1 = format!("/api/requests/{}/accept", r1);
    let uri2 = format!("/api/requests/{}/accept", r2);
    let ((s1, _), (s2, _)) = tokio::join!(
        app.put(&uri1, &donor, None),
        app.put(&uri2, &donor, None)
    );

    let successes = [s1, s2].iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1, "{} / {}", s1, s2);

    let (_, body) = app.get("/api/requests/received", Some(&donor)).await;
    let statuses: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses.iter().filter(|s| **s == "accepted").count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == "declined").count(), 1);
}

#[tokio::test]
async fn test_complete_moves_counters_and_history() {
    let app = TestApp::new().await;
    let (donor, donor_id) = app.register("Dana Donor", "dana@example.com").await;
    let (alice, alice_id) = app.register("Alice Asker", "alice@example.com").await;

    let food_id = app.list_food(&donor, "Crisp apples", 5).await;
    let (_, body) = app.get(&format!("/api/users/{}", donor_id), None).await;
    assert_eq!(body["data"]["stats"]["activeListings"], 1);

    let r1 = app.request_food(&alice, &food_id).await;

    let (status, _) = app.put(&format!("/api/requests/{}/complete", r1), &alice, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.put(&format!("/api/requests/{}/accept", r1), &donor, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.put(&format!("/api/requests/{}/complete", r1), &alice, None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "completed");
    assert!(body["data"]["completedAt"].is_string());

    let (status, _) = app.put(&format!("/api/requests/{}/complete", r1), &donor, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/api/food/{}", food_id), None).await;
    assert_eq!(body["data"]["status"], "completed");

    let (_, body) = app.get(&format!("/api/users/{}", donor_id), None).await;
    assert_eq!(body["data"]["stats"]["foodShared"], 1);
    assert_eq!(body["data"]["stats"]["activeListings"], 0);
    assert!(body["data"].get("email").is_none());

    let (_, body) = app.get(&format!("/api/users/{}", alice_id), None).await;
    assert_eq!(body["data"]["stats"]["foodReceived"], 1);

    let (_, body) = app.get("/api/users/me/history?type=donated", Some(&donor)).await;
    assert_eq!(body["pagination"]["total"], 1);
    let (_, body) = app.get("/api/users/me/history?type=received", Some(&donor)).await;
    assert_eq!(body["pagination"]["total"], 0);
    let (_, body) = app.get("/api/users/me/history", Some(&alice)).await;
    assert_eq!(body["pagination"]["total"], 1);
    let (status, _) = app.get("/api/users/me/history?type=stolen", Some(&alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/api/users/{}/food", donor_id), None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (_, body) = app.get("/api/stats", None).await;
    assert_eq!(body["data"]["users"], 2);
    assert_eq!(body["data"]["completedShares"], 1);
    assert_eq!(body["data"]["requests"]["completed"], 1);
}

#[tokio::test]
async fn test_request_rules_and_messages() {
    let app = TestApp::new().await;
    let (donor, _) = app.register("Dana Donor", "dana@example.com").await;
    let (alice, _) = app.register("Alice Asker", "alice@example.com").await;
    let (stranger, _) = app.register("Sam Stranger", "sam@example.com").await;
    let food_id = app.list_food(&donor, "Crisp apples", 2).await;

    let (status, body) = app.post("/api/requests", &donor, json!({ "food": food_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot request your own food");

    let (status, body) = app
        .post("/api/requests", &alice, json!({ "food": food_id, "requestedQuantity": 3 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "requestedQuantity");

    let (status, _) = app
        .post(
            "/api/requests",
            &alice,
            json!({ "food": "00000000-0000-0000-0000-000000000000" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let r1 = app.request_food(&alice, &food_id).await;
    let (status, body) = app.post("/api/requests", &alice, json!({ "food": food_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You have already requested this food item");

    let (_, body) = app.get("/api/requests/sent", Some(&alice)).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["message"], "Please!");

    let uri = format!("/api/requests/{}/message", r1);
    let (status, _) = app.post(&uri, &alice, json!({ "message": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&uri, &stranger, json!({ "message": "Me too?" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&uri, &alice, json!({ "message": "Free after 6pm" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = app.get(&format!("/api/requests/{}", r1), Some(&donor)).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["body"], "Free after 6pm");
    assert_eq!(messages[0]["senderName"], "Alice Asker");

    let (status, _) = app.get(&format!("/api/requests/{}", r1), Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.put(&format!("/api/requests/{}/decline", r1), &donor, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "declined");

    let (status, _) = app.put(&format!("/api/requests/{}/accept", r1), &donor, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A declined request no longer blocks a fresh one.
    app.request_food(&alice, &food_id).await;
}

#[tokio::test]
async fn test_radius_search_across_antimeridian() {
    let app = TestApp::new().await;
    let (donor, _) = app.register("Dana Donor", "dana@example.com").await;
    let (status, body) = app
        .post("/api/food", &donor, food_body_at("Taro from Taveuni", 3, [-179.98, -17.0]))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    app.list_food(&donor, "Far away apples", 1).await;

    let (_, body) = app.get("/api/food?lat=-17&lng=179.98&radius=10", None).await;
    assert_eq!(body["pagination"]["total"], 1, "{}", body);
    assert_eq!(body["data"][0]["title"], "Taro from Taveuni");
    assert!(body["data"][0]["distanceKm"].as_f64().unwrap() < 5.0);

    let (_, body) = app.get("/api/food?lat=-17&lng=-179.99&radius=10", None).await;
    assert_eq!(body["pagination"]["total"], 1, "{}", body);
}

#[tokio::test]
async fn test_delete_lifecycle() {
    let app = TestApp::new().await;
    let (donor, donor_id) = app.register("Dana Donor", "dana@example.com").await;
    let (alice, _) = app.register("Alice Asker", "alice@example.com").await;

    let quiet = app.list_food(&donor, "Nobody wants these", 1).await;
    let wanted = app.list_food(&donor, "Everybody wants these", 1).await;
    let r1 = app.request_food(&alice, &wanted).await;

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/food/{}", quiet), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/food/{}", quiet), Some(&donor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/food/{}", quiet), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/food/{}", wanted), Some(&donor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/food/{}", wanted), None).await;
    assert_eq!(body["data"]["status"], "cancelled");
    let (_, body) = app.get(&format!("/api/requests/{}", r1), Some(&alice)).await;
    assert_eq!(body["data"]["status"], "declined");

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/food/{}", wanted), Some(&donor), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Listing has transaction history and cannot be deleted");

    let (_, body) = app.get(&format!("/api/users/{}", donor_id), None).await;
    assert_eq!(body["data"]["stats"]["activeListings"], 0);
}

#[tokio::test]
async fn test_save_toggle_and_location() {
    let app = TestApp::new().await;
    let (donor, _) = app.register("Dana Donor", "dana@example.com").await;
    let (alice, _) = app.register("Alice Asker", "alice@example.com").await;
    let food_id = app.list_food(&donor, "Crisp apples", 5).await;
    let uri = format!("/api/food/{}/save", food_id);

    let (status, body) = app.post(&uri, &alice, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["saved"], true);

    let (_, body) = app.get("/api/users/me/saved", Some(&alice)).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["id"], food_id.as_str());

    let (_, body) = app.post(&uri, &alice, json!({})).await;
    assert_eq!(body["data"]["saved"], false);
    let (_, body) = app.get("/api/users/me/saved", Some(&alice)).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, _) = app
        .put("/api/users/me/location", &alice, Some(json!({ "coordinates": [-122.4] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(
            "/api/users/me/location",
            &alice,
            Some(json!({ "coordinates": [-122.4, 37.7], "address": "2 Mission Street" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["location"]["coordinates"][1], 37.7);
    assert_eq!(body["data"]["location"]["address"], "2 Mission Street");
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "connected");

    let (status, body) = app.get("/api/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/users/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
