//! # Mock Counter — Simulated Relay and Counting Service for Tests
//!
//! An in-process axum server that plays both the CORS relay and the hit-counting
//! service, so the client can be exercised end-to-end without network access.
//!
//! ## Supported Endpoints
//!
//! | Method | Path                     | Purpose                                 |
//! |--------|--------------------------|-----------------------------------------|
//! | GET    | `/?url=<target>`         | Relay: parses `<target>` and serves it  |
//! | GET    | `/v1/{ns}/{key}`         | Read a counter (404 if it never existed) |
//! | GET    | `/v1/{ns}/{key}/up`      | Increment a counter, creating it at 0   |
//!
//! Every request is recorded with its target and the `Origin` / `Content-Type`
//! headers it carried. Counters live in a `HashMap` keyed by `"<ns>/<key>"`.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pagehits::CounterConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// What the mock returns for every counter request.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Serve counters normally.
    Normal,
    /// Return the given HTTP status with a JSON error body.
    Error(u16),
    /// Return 200 with a body that is not JSON.
    MalformedJson,
    /// Return 200 with a JSON object lacking `count`.
    MissingCount,
    /// Sleep before serving normally.
    Delay(Duration),
}

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Full target URL for relayed requests, request path for direct ones.
    pub target: String,
    pub relayed: bool,
    pub origin: Option<String>,
    pub content_type: Option<String>,
    pub allow_origin: Option<String>,
}

#[derive(Debug)]
struct MockState {
    behavior: MockBehavior,
    counts: HashMap<String, u64>,
    requests: Vec<RecordedRequest>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            behavior: MockBehavior::Normal,
            counts: HashMap::new(),
            requests: Vec::new(),
        }
    }
}

type SharedState = Arc<Mutex<MockState>>;

/// A running mock server, shut down when dropped.
pub struct MockCounter {
    base_url: String,
    _abort_handle: tokio::task::AbortHandle,
    state: SharedState,
}

impl Drop for MockCounter {
    fn drop(&mut self) {
        self._abort_handle.abort();
    }
}

impl MockCounter {
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    pub fn builder() -> MockCounterBuilder {
        MockCounterBuilder {
            state: MockState::default(),
        }
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`.
    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    /// Config that sends requests through this mock acting as the relay.
    /// The relayed target still names the real counting service.
    pub fn relay_config(&self) -> CounterConfig {
        CounterConfig {
            relay_url: Some(self.url()),
            ..Default::default()
        }
    }

    /// Config that talks to this mock as the counting service, no relay.
    pub fn direct_config(&self) -> CounterConfig {
        CounterConfig {
            relay_url: None,
            api_base: format!("{}/v1", self.url()),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count_of(&self, namespace: &str, key: impl ToString) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .counts
            .get(&format!("{}/{}", namespace, key.to_string()))
            .copied()
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.state.lock().unwrap().behavior = behavior;
    }
}

pub struct MockCounterBuilder {
    state: MockState,
}

impl MockCounterBuilder {
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.state.behavior = behavior;
        self
    }

    /// Pre-populate a counter.
    pub fn with_count(mut self, namespace: &str, key: impl ToString, count: u64) -> Self {
        self.state
            .counts
            .insert(format!("{}/{}", namespace, key.to_string()), count);
        self
    }

    pub async fn start(self) -> MockCounter {
        let shared_state: SharedState = Arc::new(Mutex::new(self.state));

        let app = Router::new()
            .route("/", get(handle_relay))
            .route("/v1/{ns}/{key}", get(handle_read))
            .route("/v1/{ns}/{key}/up", get(handle_up))
            .with_state(Arc::clone(&shared_state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock counter to random port");
        let addr: SocketAddr = listener
            .local_addr()
            .expect("Failed to get mock counter local address");
        let base_url = format!("http://127.0.0.1:{}", addr.port());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock counter server failed");
        });

        MockCounter {
            base_url,
            _abort_handle: handle.abort_handle(),
            state: shared_state,
        }
    }
}

/// Returns a URL on which nothing is listening.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

// ── Handlers ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RelayQuery {
    url: String,
}

async fn handle_relay(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<RelayQuery>,
) -> Response {
    let segments: Vec<String> = match url::Url::parse(&query.url) {
        Ok(target) => target
            .path_segments()
            .map(|s| s.map(str::to_string).collect())
            .unwrap_or_default(),
        Err(_) => return (StatusCode::BAD_REQUEST, "bad relay target").into_response(),
    };
    serve(&state, &headers, query.url, true, segments).await
}

async fn handle_read(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((ns, key)): Path<(String, String)>,
) -> Response {
    let target = format!("/v1/{}/{}", ns, key);
    serve(&state, &headers, target, false, vec!["v1".into(), ns, key]).await
}

async fn handle_up(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((ns, key)): Path<(String, String)>,
) -> Response {
    let target = format!("/v1/{}/{}/up", ns, key);
    let segments = vec!["v1".into(), ns, key, "up".into()];
    serve(&state, &headers, target, false, segments).await
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn serve(
    state: &SharedState,
    headers: &HeaderMap,
    target: String,
    relayed: bool,
    segments: Vec<String>,
) -> Response {
    let behavior = {
        let mut s = state.lock().unwrap();
        s.requests.push(RecordedRequest {
            target,
            relayed,
            origin: header(headers, "origin"),
            content_type: header(headers, "content-type"),
            allow_origin: header(headers, "access-control-allow-origin"),
        });
        s.behavior.clone()
    };

    match behavior {
        MockBehavior::Normal => {}
        MockBehavior::Error(status) => {
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (code, Json(serde_json::json!({ "message": "mock error" }))).into_response();
        }
        MockBehavior::MalformedJson => {
            return (StatusCode::OK, "<html>Too Many Requests</html>").into_response();
        }
        MockBehavior::MissingCount => {
            return Json(serde_json::json!({ "id": 1, "name": "x" })).into_response();
        }
        MockBehavior::Delay(d) => tokio::time::sleep(d).await,
    }

    let (ns, key, increment) = match segments.as_slice() {
        [v1, ns, key] if v1 == "v1" => (ns, key, false),
        [v1, ns, key, up] if v1 == "v1" && up == "up" => (ns, key, true),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    let id = format!("{}/{}", ns, key);
    let mut s = state.lock().unwrap();
    let count = if increment {
        let slot = s.counts.entry(id).or_insert(0);
        *slot += 1;
        *slot
    } else {
        match s.counts.get(&id) {
            Some(c) => *c,
            None => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({ "message": "record not found" })),
                )
                    .into_response()
            }
        }
    };

    Json(serde_json::json!({
        "id": 1,
        "name": key,
        "count": count,
        "created_at": "2024-01-01T00:00:00Z",
    }))
    .into_response()
}
