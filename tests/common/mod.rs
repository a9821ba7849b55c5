//! Common test utilities for sahaayak integration tests.
//!
//! Provides `TestEnv` for isolated config directories and `MockServer`, an
//! in-process stand-in for the complaints REST API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
pub use tempfile::TempDir;

/// A test environment with an isolated config directory.
///
/// The `shk()` method returns a `Command` that sets `SHK_CONFIG_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the shk binary with an isolated config directory.
    pub fn shk(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_shk"));
        cmd.env("SHK_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("SHK_SERVER_URL");
        cmd.env("SHK_LOG", "off");
        cmd
    }

    pub fn config_file(&self) -> std::path::PathBuf {
        self.config_dir.path().join("config.kdl")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A request the mock server received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockState {
    complaints: Vec<Value>,
    /// Answer every list request with this status
    failure: Option<u16>,
    requests: Vec<Recorded>,
}

type Shared = Arc<Mutex<MockState>>;

/// Complaints API on a random local port, served from its own thread.
pub struct MockServer {
    pub url: String,
    state: Shared,
}

impl MockServer {
    pub fn start(complaints: Vec<Value>) -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState {
            complaints,
            ..MockState::default()
        }));

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let app = Router::new()
            .route("/api/complaints", get(list_complaints))
            .route("/api/my-complaints", get(my_complaints))
            .route("/api/complaints/:id/status", put(update_status))
            .route("/api/update-priority/:id", put(update_priority))
            .route("/api/complaints/:id/feedback", post(submit_feedback))
            .with_state(state.clone());

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self { url, state }
    }

    /// Change a complaint's status as if staff had edited it elsewhere.
    pub fn set_status(&self, id: i64, status: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.complaints.iter_mut().find(|c| c["id"] == id) {
            c["status"] = json!(status);
        }
    }

    pub fn fail_with(&self, status: Option<u16>) {
        self.state.lock().unwrap().failure = status;
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests to `path`, oldest first.
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

pub fn complaint(id: i64, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("Complaint number {}", id),
        "category": "Roads",
        "photo": null,
        "voice": null,
        "latitude": 12.9716,
        "longitude": 77.5946,
        "address": "MG Road, Bengaluru",
        "status": status,
        "priority": "Medium",
        "auto_priority": "High",
        "rating": null,
        "feedback": null,
        "created_at": "2026-10-01 09:30:00"
    })
}

fn record(state: &mut MockState, method: &'static str, path: String, query: HashMap<String, String>, body: Option<Value>) {
    state.requests.push(Recorded {
        method,
        path,
        query,
        body,
    });
}

fn list_response(state: &MockState, filter: impl Fn(&Value) -> bool) -> Response {
    if let Some(code) = state.failure {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "<html>Internal Server Error</html>").into_response();
    }
    let matching: Vec<Value> = state.complaints.iter().filter(|c| filter(c)).cloned().collect();
    Json(Value::Array(matching)).into_response()
}

async fn list_complaints(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "GET", "/api/complaints".into(), query.clone(), None);
    list_response(&state, |c| match query.get("status") {
        Some(status) => c["status"] == status.as_str(),
        None => true,
    })
}

async fn my_complaints(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "GET", "/api/my-complaints".into(), query.clone(), None);
    let name = query.get("name").cloned().unwrap_or_default();
    list_response(&state, |c| c["name"] == name.as_str())
}

async fn update_status(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "PUT", format!("/api/complaints/{}/status", id), HashMap::new(), Some(body.clone()));
    match state.complaints.iter_mut().find(|c| c["id"] == id) {
        Some(c) => {
            c["status"] = body["status"].clone();
            Json(json!({ "message": "Status updated" })).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Complaint not found" }))).into_response(),
    }
}

async fn update_priority(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "PUT", format!("/api/update-priority/{}", id), HashMap::new(), Some(body.clone()));
    if let Some(c) = state.complaints.iter_mut().find(|c| c["id"] == id) {
        c["priority"] = body["priority"].clone();
    }
    Json(json!({ "message": "Priority updated" })).into_response()
}

async fn submit_feedback(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "POST", format!("/api/complaints/{}/feedback", id), HashMap::new(), Some(body.clone()));
    let Some(c) = state.complaints.iter_mut().find(|c| c["id"] == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Complaint not found" }))).into_response();
    };
    if c["status"] != "Resolved" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Feedback can only be given for resolved complaints" })),
        )
            .into_response();
    }
    c["rating"] = body["rating"].clone();
    c["feedback"] = body["feedback"].clone();
    Json(json!({ "message": "Feedback submitted" })).into_response()
}
