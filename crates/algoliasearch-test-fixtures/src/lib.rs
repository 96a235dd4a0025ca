//! Test fixtures for algoliasearch integration tests.
//!
//! This crate provides mock hosts: small HTTP servers bound to `127.0.0.1`
//! that answer every request with a scripted response and record what they
//! received. Point a client at them with `scheme = "http"` and an explicit
//! host list.
//!
//! # Usage
//!
//! ```rust,no_run
//! use algoliasearch_test_fixtures::{MockHost, unreachable_host};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let healthy = MockHost::respond(200, r#"{"items":[]}"#).await;
//!     let hosts = vec![unreachable_host(), healthy.host()];
//!     // Build a client with `hosts`, make a call...
//!     assert_eq!(healthy.hits(), 1);
//! }
//! ```

use std::{
    collections::VecDeque,
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tokio::{net::TcpListener, task::JoinHandle};

/// A scripted response
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    /// Wait this long before answering
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into(), delay: None }
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request received by a [`MockHost`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, e.g. `/1/indexes/products/query`
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Value of a header, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body parsed as JSON
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Request body should be JSON")
    }
}

#[derive(Debug)]
struct MockState {
    /// Responses consumed in order; `fallback` is used once they run out
    queued: Mutex<VecDeque<MockResponse>>,
    fallback: MockResponse,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A mock host serving scripted responses on an ephemeral local port.
///
/// The server stops when the `MockHost` is dropped.
#[derive(Debug)]
pub struct MockHost {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockHost {
    /// Starts a host that answers every request with `status` and `body`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use algoliasearch_test_fixtures::MockHost;
    ///
    /// # async fn example() {
    /// let host = MockHost::respond(503, r#"{"message":"unavailable"}"#).await;
    /// # }
    /// ```
    pub async fn respond(status: u16, body: &str) -> Self {
        Self::start(Vec::new(), MockResponse::new(status, body)).await
    }

    /// Starts a host that waits `delay` before answering.
    pub async fn delayed(delay: Duration, status: u16, body: &str) -> Self {
        Self::start(Vec::new(), MockResponse::new(status, body).delayed(delay)).await
    }

    /// Starts a host that serves `responses` in order, then repeats the last one.
    ///
    /// # Panics
    ///
    /// Panics if `responses` is empty.
    pub async fn sequence(responses: Vec<MockResponse>) -> Self {
        let fallback = responses.last().cloned().expect("At least one response is required");
        Self::start(responses, fallback).await
    }

    async fn start(queued: Vec<MockResponse>, fallback: MockResponse) -> Self {
        let state = Arc::new(MockState {
            queued: Mutex::new(queued.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        });

        let listener =
            TcpListener::bind("127.0.0.1:0").await.expect("Mock host should bind a local port");
        let addr = listener.local_addr().expect("Mock host should have a local address");

        let app = Router::new().fallback(serve_scripted).with_state(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, handle }
    }

    /// Host name to put in a host list (`127.0.0.1:<port>`)
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Number of requests received so far
    pub fn hits(&self) -> usize {
        self.state.requests.lock().len()
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }
}

impl Drop for MockHost {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_scripted(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_default();
    state.requests.lock().push(RecordedRequest {
        method: method.to_string(),
        path,
        headers,
        body: body.to_vec(),
    });

    let response = state.queued.lock().pop_front().unwrap_or_else(|| state.fallback.clone());
    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], response.body).into_response()
}

/// Returns a `127.0.0.1:<port>` address nothing is listening on.
///
/// The port is briefly bound to find a free one, then released, so connections
/// to it are refused.
pub fn unreachable_host() -> String {
    let listener =
        StdTcpListener::bind("127.0.0.1:0").expect("Should bind an ephemeral local port");
    let addr = listener.local_addr().expect("Listener should have a local address");
    drop(listener);
    addr.to_string()
}
