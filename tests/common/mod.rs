//! In-process stand-in for the remote onboarding service.
//!
//! Records every request and tracks which steps are done so progress
//! responses follow what was submitted.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const VALID_OTP: &str = "123456";
pub const TAKEN_EMAIL: &str = "taken@example.com";

const PROGRESS_KEYS: [&str; 6] = [
    "level1.basic",
    "level1.profile_media",
    "level1.categories_social",
    "level2.business_details",
    "level2.documents",
    "level3.physical_store",
];

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct MockState {
    pub requests: Vec<Recorded>,
    pub done: Vec<&'static str>,
    pub starts: u32,
    /// Canned reply for the next request to this path.
    pub fail_next: Option<(String, StatusCode, Value)>,
}

pub struct MockService {
    pub base_url: String,
    pub state: Arc<Mutex<MockState>>,
}

impl MockService {
    pub fn paths(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|r| r.path.clone())
            .collect()
    }

    pub fn last(&self, path: &str) -> Option<Recorded> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .rev()
            .find(|r| r.path == path)
            .cloned()
    }

    pub fn mark_done(&self, keys: &[&'static str]) {
        self.state.lock().unwrap().done.extend_from_slice(keys);
    }

    pub fn fail_next(&self, path: &str, status: StatusCode, body: Value) {
        self.state.lock().unwrap().fail_next = Some((path.to_string(), status, body));
    }
}

/// Spawn the mock service on a random local port.
pub async fn start_mock_service() -> MockService {
    let state = Arc::new(Mutex::new(MockState::default()));
    let app = Router::new()
        .fallback(handle)
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    MockService {
        base_url: format!("http://127.0.0.1:{port}"),
        state,
    }
}

/// Serve `app` on a random local port, returning the port.
pub async fn serve(app: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}

async fn handle(
    State(state): State<Arc<Mutex<MockState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let recorded = Recorded {
        method,
        path: uri.path().to_string(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let mut state = state.lock().unwrap();
    state.requests.push(recorded.clone());

    if let Some((path, status, reply)) = state.fail_next.take() {
        if path == recorded.path {
            return (status, Json(reply)).into_response();
        }
        state.fail_next = Some((path, status, reply));
    }

    let saved = || Json(json!({ "status": true, "message": "Saved" })).into_response();

    match recorded.path.as_str() {
        "/onboarding/start" => {
            if recorded.body.contains(TAKEN_EMAIL) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "status": false, "message": "Email already registered" })),
                )
                    .into_response();
            }
            state.starts += 1;
            if !state.done.contains(&"level1.basic") {
                state.done.push("level1.basic");
            }
            Json(json!({
                "status": "success",
                "message": "Verification code sent",
                "data": { "token": format!("tok-{}", state.starts), "storeId": 77 }
            }))
            .into_response()
        }
        "/auth/verify-otp" => {
            let otp = serde_json::from_str::<Value>(&recorded.body)
                .ok()
                .and_then(|v| v["otp"].as_str().map(String::from))
                .unwrap_or_default();
            if otp == VALID_OTP {
                Json(json!({ "status": "success", "message": "Email verified" })).into_response()
            } else {
                Json(json!({ "status": false, "message": "Invalid OTP" })).into_response()
            }
        }
        "/onboarding/profile-media" => {
            state.done.push("level1.profile_media");
            saved()
        }
        "/onboarding/categories-social" => {
            state.done.push("level1.categories_social");
            saved()
        }
        "/onboarding/business-details" => {
            state.done.push("level2.business_details");
            saved()
        }
        "/onboarding/documents" => {
            state.done.push("level2.documents");
            saved()
        }
        "/onboarding/physical-store" => {
            state.done.push("level3.physical_store");
            saved()
        }
        "/onboarding/theme" => saved(),
        "/onboarding/submit" => {
            if recorded.authorization.as_deref() == Some("Bearer broken") {
                return (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").into_response();
            }
            Json(json!({ "status": true, "message": "Store submitted for review" })).into_response()
        }
        "/onboarding/progress" => {
            let steps: Vec<Value> = PROGRESS_KEYS
                .iter()
                .map(|key| {
                    let status = if state.done.contains(key) { "done" } else { "pending" };
                    json!({ "key": key, "status": status })
                })
                .collect();
            Json(json!({ "status": true, "data": { "steps": steps } })).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
