#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sanpo::api::create_router;
use sanpo::config::Config;
use sanpo::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Router backed by a fresh SQLite database in a temp directory.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    // Keeps the database and uploads alive for the test
    pub dir: TempDir,
}

/// Create a test app with built-in course modes seeded.
pub async fn create_test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config::with_data_root(dir.path());
    std::fs::create_dir_all(&config.server.upload_dir).expect("Failed to create upload dir");

    let db = sanpo::db::init(&config.server.data_dir)
        .await
        .expect("Failed to initialize database");

    let state = Arc::new(AppState::new(config, db));
    TestApp {
        router: create_router(state.clone()),
        state,
        dir,
    }
}

impl TestApp {
    /// Send a request and return the status and parsed JSON body (Null when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.json(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.json(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.json(Method::DELETE, uri, token, None).await
    }

    /// Register a user and log in, returning the token.
    pub async fn login_as(&self, username: &str) -> String {
        let password = "stroll-along-1999";
        let (status, body) = self
            .post(
                "/api/auth/register/",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": password,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        let (status, body) = self
            .post(
                "/api/auth/login/",
                None,
                json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

/// A minimal template payload with `n` spots numbered 1..=n.
pub fn template_payload(title: &str, n: usize, mode_codes: &[&str]) -> Value {
    let spots: Vec<Value> = (1..=n)
        .map(|i| {
            json!({
                "order": i,
                "name": format!("Spot {}", i),
                "place_id": format!("place-{}", i),
                "category": "park",
                "stay_time_min": 10,
                "lat": 35.0 + i as f64 * 0.001,
                "lng": 135.0,
            })
        })
        .collect();

    json!({
        "title": title,
        "description": "",
        "mood": "relax",
        "default_distance_m": 1200,
        "default_duration_min": 40,
        "mode_codes": mode_codes,
        "is_public": false,
        "spots": spots,
    })
}
