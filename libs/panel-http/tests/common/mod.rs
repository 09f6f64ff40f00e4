//! Common test utilities for panel-http integration tests
//!
//! [`MockApi`] runs an axum server on `127.0.0.1:0` with a hit counter per
//! route and a scripted status sequence for `/flaky`.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

#[derive(Default)]
struct ApiState {
    hits: Mutex<HashMap<String, usize>>,
    flaky_script: Mutex<VecDeque<u16>>,
    last_body: Mutex<Option<Value>>,
}

impl ApiState {
    fn hit(&self, route: &str) {
        *self.hits.lock().entry(route.to_string()).or_default() += 1;
    }
}

/// Mock reader backend
pub struct MockApi {
    pub addr: SocketAddr,
    state: Arc<ApiState>,
    shutdown: Arc<Notify>,
}

impl MockApi {
    /// `flaky` lists the statuses `/flaky` answers with before settling on 200
    pub async fn start(flaky: impl IntoIterator<Item = u16>) -> Self {
        let state = Arc::new(ApiState::default());
        state.flaky_script.lock().extend(flaky);

        let router = Router::new()
            .route("/api/flaky", get(flaky_handler))
            .route("/api/broken", get(broken_handler))
            .route("/api/slow", get(slow_handler))
            .route("/api/echo-query", get(echo_query_handler))
            .route("/api/echo-headers", get(echo_headers_handler))
            .route("/api/text", get(text_handler))
            .route("/api/binary", get(binary_handler))
            .route("/api/bad-json", get(bad_json_handler))
            .route("/api/readers", post(create_reader_handler).put(create_reader_handler))
            .route("/api/readers/{id}", delete(delete_reader_handler))
            .route("/api/logs", post(logs_handler))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);

        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move { signal.notified().await })
                .await;
        });

        Self { addr, state, shutdown }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn hits(&self, route: &str) -> usize {
        self.state.hits.lock().get(route).copied().unwrap_or(0)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().clone()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

async fn flaky_handler(State(state): State<Arc<ApiState>>) -> Response {
    state.hit("flaky");
    let scripted = state.flaky_script.lock().pop_front();
    match scripted {
        Some(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({"error": "unavailable"}))).into_response()
        }
        None => Json(json!({"status": "success"})).into_response(),
    }
}

async fn broken_handler(State(state): State<Arc<ApiState>>) -> Response {
    state.hit("broken");
    (StatusCode::INTERNAL_SERVER_ERROR, "reader offline").into_response()
}

async fn slow_handler(State(state): State<Arc<ApiState>>) -> Response {
    state.hit("slow");
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({"status": "late"})).into_response()
}

async fn echo_query_handler(State(state): State<Arc<ApiState>>, RawQuery(query): RawQuery) -> Response {
    state.hit("echo-query");
    Json(json!({"query": query})).into_response()
}

async fn echo_headers_handler(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    state.hit("echo-headers");
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Json(json!({
        "authorization": value("authorization"),
        "content_type": value("content-type"),
        "x_trace": value("x-trace"),
    }))
    .into_response()
}

async fn text_handler(State(state): State<Arc<ApiState>>) -> Response {
    state.hit("text");
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "reader ready").into_response()
}

async fn binary_handler(State(state): State<Arc<ApiState>>) -> Response {
    state.hit("binary");
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Bytes::from_static(&[0x3b, 0x8f, 0x80, 0x01]),
    )
        .into_response()
}

async fn bad_json_handler(State(state): State<Arc<ApiState>>) -> Response {
    state.hit("bad-json");
    ([(header::CONTENT_TYPE, "application/json")], "{not json").into_response()
}

async fn create_reader_handler(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> Response {
    state.hit("readers");
    *state.last_body.lock() = Some(body.clone());
    (StatusCode::CREATED, Json(json!({"created": body}))).into_response()
}

async fn delete_reader_handler(State(state): State<Arc<ApiState>>, Path(id): Path<String>) -> Response {
    state.hit(&format!("readers/{}", id));
    StatusCode::NO_CONTENT.into_response()
}

async fn logs_handler(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> Response {
    state.hit("logs");
    *state.last_body.lock() = Some(body);
    Json(json!({"accepted": true})).into_response()
}
