#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Send one request through a router and decode the JSON response body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

pub fn post_log(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/log")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn get_health() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

/// A request received by [`FakeGoogle`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
struct FakeState {
    writes: Arc<Mutex<Vec<RecordedRequest>>>,
    write_failure: Arc<Mutex<Option<StatusCode>>>,
    token_failure: Arc<Mutex<Option<StatusCode>>>,
    token_expires_in: Arc<Mutex<Option<u64>>>,
    token_forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
    token_requests: Arc<AtomicUsize>,
}

/// In-process stand-in for the Firestore REST API and the OAuth token endpoint.
///
/// - `POST /v1/...` records the request and answers like `createDocument`
/// - `POST /token` answers like Google's token endpoint
pub struct FakeGoogle {
    pub addr: SocketAddr,
    state: FakeState,
}

impl FakeGoogle {
    pub async fn start() -> Self {
        let state = FakeState::default();
        let app = Router::new()
            .route("/v1/{*rest}", post(create_document))
            .route("/token", post(issue_token))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// `host:port`, as used for an emulator host.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn token_uri(&self) -> String {
        format!("http://{}/token", self.addr)
    }

    pub fn writes(&self) -> Vec<RecordedRequest> {
        self.state.writes.lock().unwrap().clone()
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn fail_writes_with(&self, status: StatusCode) {
        *self.state.write_failure.lock().unwrap() = Some(status);
    }

    pub fn fail_tokens_with(&self, status: StatusCode) {
        *self.state.token_failure.lock().unwrap() = Some(status);
    }

    /// Form fields of every token request, oldest first.
    pub fn token_forms(&self) -> Vec<HashMap<String, String>> {
        self.state.token_forms.lock().unwrap().clone()
    }

    /// `expires_in` reported for issued tokens (default 3599).
    pub fn set_token_expires_in(&self, secs: u64) {
        *self.state.token_expires_in.lock().unwrap() = Some(secs);
    }
}

async fn create_document(
    State(state): State<FakeState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(status) = *state.write_failure.lock().unwrap() {
        let error = json!({
            "error": {"code": status.as_u16(), "message": "fake failure", "status": "UNAVAILABLE"}
        });
        return (status, Json(error)).into_response();
    }

    let path = uri.path().to_string();
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut writes = state.writes.lock().unwrap();
    writes.push(RecordedRequest {
        path: path.clone(),
        authorization,
        body: body.clone(),
    });

    let name = format!("{}/doc{}", path.trim_start_matches("/v1/"), writes.len());
    (
        StatusCode::OK,
        Json(json!({"name": name, "fields": body["fields"].clone()})),
    )
        .into_response()
}

async fn issue_token(
    State(state): State<FakeState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    state.token_forms.lock().unwrap().push(form);
    if let Some(status) = *state.token_failure.lock().unwrap() {
        return (status, Json(json!({"error": "invalid_grant"}))).into_response();
    }
    let expires_in = state.token_expires_in.lock().unwrap().unwrap_or(3599);
    (
        StatusCode::OK,
        Json(json!({
            "access_token": "fake-access-token",
            "expires_in": expires_in,
            "token_type": "Bearer"
        })),
    )
        .into_response()
}
