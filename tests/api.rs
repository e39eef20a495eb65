//! End-to-end tests of the HTTP surface, run in process against the
//! in-memory stores.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use taskboard::{app::build_app, config::AppConfig, state::AppState};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    app: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("integration-secret".into()),
            _ => None,
        })
        .expect("config");
        let state = AppState::in_memory(config);
        Self {
            app: build_app(state.clone()),
            state,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        self.raw(req).await
    }

    async fn raw(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    /// Registers a user and returns `(user_id, token)`.
    async fn register(&self, name: &str, email: &str) -> (Uuid, String) {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({"name": name, "email": email, "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
        (id, body["token"].as_str().unwrap().to_string())
    }

    async fn create_task(&self, token: &str, body: Value) -> Value {
        let (status, task) = self.send("POST", "/api/tasks", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{task}");
        task
    }
}

#[tokio::test]
async fn health_is_public() {
    let t = TestApp::new();
    let (status, body) = t.send("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn register_returns_token_for_new_user() {
    let t = TestApp::new();
    let (status, body) = t
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"name": "Ada", "email": "Ada@Example.com", "password": "secret1"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let user_id: Uuid = body["user"]["id"].as_str().unwrap().parse().unwrap();
    let claims = t.state.jwt.verify(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.sub, user_id);
}

#[tokio::test]
async fn register_validation_and_duplicates() {
    let t = TestApp::new();
    t.register("Ada", "ada@example.com").await;

    let cases = [
        json!({"email": "x@example.com", "password": "secret1"}),
        json!({"name": "X", "email": "x@example.com", "password": "12345"}),
        json!({"name": "Ada again", "email": "ADA@example.COM", "password": "secret1"}),
    ];
    let mut messages = Vec::new();
    for body in cases {
        let (status, resp) = t.send("POST", "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
        messages.push(resp["message"].as_str().unwrap().to_string());
    }
    assert_eq!(
        messages,
        [
            "All fields are required",
            "Password must be at least 6 characters",
            "Email already exists"
        ]
    );
}

#[tokio::test]
async fn login_success_and_uniform_failure() {
    let t = TestApp::new();
    let (id, _) = t.register("Ada", "ada@example.com").await;

    let (status, body) = t
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "secret1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.to_string());
    assert_eq!(t.state.jwt.verify(body["token"].as_str().unwrap()).unwrap().sub, id);

    let wrong_pw = json!({"email": "ada@example.com", "password": "wrong!!"});
    let unknown = json!({"email": "bob@example.com", "password": "secret1"});
    let (s1, wrong_pw) = t.send("POST", "/api/auth/login", None, Some(wrong_pw)).await;
    let (s2, unknown) = t.send("POST", "/api/auth/login", None, Some(unknown)).await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw, unknown);
    assert_eq!(wrong_pw["message"], "Invalid credentials");

    let (status, _) = t
        .send("POST", "/api/auth/login", None, Some(json!({"email": "ada@example.com"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_requires_valid_token() {
    let t = TestApp::new();
    let (id, token) = t.register("Ada", "ada@example.com").await;

    let (status, body) = t.send("GET", "/api/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.to_string());
    assert_eq!(body["user"]["name"], "Ada");

    let (status, _) = t.send("GET", "/api/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_and_garbage_tokens_look_the_same() {
    let t = TestApp::new();
    let (id, _) = t.register("Ada", "ada@example.com").await;

    let expired = t
        .state
        .jwt
        .issue_at(id, OffsetDateTime::now_utc() - Duration::days(8))
        .unwrap();
    let (s1, expired_body) = t.send("GET", "/api/tasks", Some(&expired), None).await;
    let (s2, garbage_body) = t.send("GET", "/api/tasks", Some("not-a-token"), None).await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(expired_body, garbage_body);
}

#[tokio::test]
async fn task_routes_require_auth() {
    let t = TestApp::new();
    let id = Uuid::new_v4();
    let calls = [
        ("GET", "/api/tasks".to_string()),
        ("POST", "/api/tasks".to_string()),
        ("PUT", format!("/api/tasks/{id}")),
        ("DELETE", format!("/api/tasks/{id}")),
    ];
    for (method, uri) in calls {
        let (status, body) = t.send(method, &uri, None, Some(json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["message"], "Authentication required");
    }
}

#[tokio::test]
async fn create_then_list_round_trip() {
    let t = TestApp::new();
    let (id, token) = t.register("Ada", "ada@example.com").await;

    let created = t.create_task(&token, json!({"title": "Buy milk"})).await;
    assert_eq!(created["userId"], id.to_string());

    let (status, list) = t.send("GET", "/api/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let first = &list.as_array().unwrap()[0];
    assert_eq!(first["_id"], created["_id"]);
    assert_eq!(first["title"], "Buy milk");
    assert_eq!(first["description"], "");
    assert_eq!(first["status"], "pending");
    assert!(first["createdAt"].is_string());
    assert!(first["updatedAt"].is_string());
}

#[tokio::test]
async fn list_is_newest_first() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;

    for title in ["first", "second", "third"] {
        t.create_task(&token, json!({"title": title})).await;
    }

    let (_, list) = t.send("GET", "/api/tasks", Some(&token), None).await;
    let titles: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["third", "second", "first"]);
}

#[tokio::test]
async fn create_validation() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;

    let (status, body) = t
        .send("POST", "/api/tasks", Some(&token), Some(json!({"title": "   "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title is required");

    let bad_status = json!({"title": "x", "status": "archived"});
    let (status, body) = t
        .send("POST", "/api/tasks", Some(&token), Some(bad_status))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid status");

    let created = t
        .create_task(
            &token,
            json!({"title": "  Trim me  ", "description": "  and me ", "status": "in-progress"}),
        )
        .await;
    assert_eq!(created["title"], "Trim me");
    assert_eq!(created["description"], "and me");
    assert_eq!(created["status"], "in-progress");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/tasks")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let (status, body) = t.raw(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request body");
}

#[tokio::test]
async fn status_only_update() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;
    let created = t
        .create_task(&token, json!({"title": "Buy milk", "description": "semi-skimmed"}))
        .await;
    let uri = format!("/api/tasks/{}", created["_id"].as_str().unwrap());

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let (status, updated) = t
        .send("PUT", &uri, Some(&token), Some(json!({"status": "completed"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["title"], "Buy milk");
    assert_eq!(updated["description"], "semi-skimmed");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_ne!(updated["updatedAt"], created["updatedAt"]);
}

#[tokio::test]
async fn bodiless_update_only_touches_updated_at() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;
    let created = t.create_task(&token, json!({"title": "Buy milk"})).await;
    let uri = format!("/api/tasks/{}", created["_id"].as_str().unwrap());

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let (status, updated) = t.send("PUT", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["title"], "Buy milk");
    assert_eq!(updated["status"], "pending");
    assert_ne!(updated["updatedAt"], created["updatedAt"]);

    let req = Request::builder()
        .method("PUT")
        .uri(&uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::empty())
        .unwrap();
    let (status, _) = t.raw(req).await;
    assert_eq!(status, StatusCode::OK);

    let missing = format!("/api/tasks/{}", Uuid::new_v4());
    let (status, body) = t.send("PUT", &missing, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Task not found");
}

#[tokio::test]
async fn malformed_update_body_is_a_bad_request() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;
    let created = t.create_task(&token, json!({"title": "Buy milk"})).await;

    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/tasks/{}", created["_id"].as_str().unwrap()))
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from("{\"status\": "))
        .unwrap();
    let (status, body) = t.raw(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request body");
}

#[tokio::test]
async fn empty_title_update_leaves_task_untouched() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;
    let created = t.create_task(&token, json!({"title": "Keep me"})).await;
    let uri = format!("/api/tasks/{}", created["_id"].as_str().unwrap());

    let (status, body) = t.send("PUT", &uri, Some(&token), Some(json!({"title": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title cannot be empty");

    let (_, list) = t.send("GET", "/api/tasks", Some(&token), None).await;
    assert_eq!(list[0], created);
}

#[tokio::test]
async fn users_cannot_touch_each_others_tasks() {
    let t = TestApp::new();
    let (_, alice) = t.register("Alice", "alice@example.com").await;
    let (_, bob) = t.register("Bob", "bob@example.com").await;

    let task = t.create_task(&alice, json!({"title": "Alice's secret"})).await;
    let uri = format!("/api/tasks/{}", task["_id"].as_str().unwrap());

    let (status, list) = t.send("GET", "/api/tasks", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));

    let (status, body) = t
        .send("PUT", &uri, Some(&bob), Some(json!({"title": "mine now"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Task not found");

    let (status, _) = t.send("DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A task that never existed answers the same way.
    let missing = format!("/api/tasks/{}", Uuid::new_v4());
    let (status, missing_body) = t.send("DELETE", &missing, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing_body["message"], "Task not found");

    let (_, list) = t.send("GET", "/api/tasks", Some(&alice), None).await;
    assert_eq!(list[0]["title"], "Alice's secret");
}

#[tokio::test]
async fn delete_is_permanent() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;
    let task = t.create_task(&token, json!({"title": "Short-lived"})).await;
    let uri = format!("/api/tasks/{}", task["_id"].as_str().unwrap());

    let (status, body) = t.send("DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");

    let (status, _) = t.send("DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = t.send("GET", "/api/tasks", Some(&token), None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn malformed_task_id_is_not_found() {
    let t = TestApp::new();
    let (_, token) = t.register("Ada", "ada@example.com").await;
    let (status, _) = t
        .send("PUT", "/api/tasks/not-a-uuid", Some(&token), Some(json!({"title": "x"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
