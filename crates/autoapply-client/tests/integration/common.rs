use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tower_http::compression::CompressionLayer;

use autoapply_core::config::SessionConfig;
use autoapply_core::error::AppError;
use autoapply_core::models::{LogEntry, PostingId};
use autoapply_core::traits::Ledger;

pub const LISTING_JSON: &str = r#"{"vacancySearchResult":{"vacancies":[
    {"vacancyId":"101","name":"Rust backend engineer","employer":{"name":"Acme"}},
    {"vacancyId":"102","name":"Systems programmer","employer":{"name":"Initech"}},
    {"vacancyId":103,"name":"Platform engineer","employer":{"name":"Globex"}}
]}}"#;

/// One request as seen by the stub.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone, Default)]
struct StubState {
    requests: Arc<Mutex<Vec<Captured>>>,
}

/// In-process stand-in for the upstream site.
///
/// - `GET /search` serves [`LISTING_JSON`] (gzip when accepted)
/// - `GET /forbidden` answers 403
/// - `POST /apply/ok` answers 200, `POST /apply/reject` answers 403
/// - `POST /interaction` answers 200
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl StubServer {
    pub async fn start() -> Self {
        let state = StubState::default();
        let requests = state.requests.clone();

        let app = Router::new()
            .fallback(handle)
            .with_state(state)
            .layer(CompressionLayer::new());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub server");
        let addr = listener.local_addr().expect("Failed to read stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    /// Session configuration pointing every endpoint at this stub.
    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            base_url: self.base_url.clone(),
            resume_id: "resume-1".into(),
            cookies: "hhtoken=abc; _xsrf=TOKEN123; hhuid=xyz".into(),
            search_url: self.url("/search"),
            apply_url: self.url("/apply/ok"),
            interaction_url: self.url("/interaction"),
            ..SessionConfig::default()
        }
    }
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(Captured {
        method: method.clone(),
        path: path.clone(),
        headers,
        body,
    });

    match (method, path.as_str()) {
        (Method::GET, "/search") => (
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            LISTING_JSON,
        )
            .into_response(),
        (Method::GET, "/forbidden") => StatusCode::FORBIDDEN.into_response(),
        (Method::POST, "/apply/ok") => (
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"success":true}"#,
        )
            .into_response(),
        (Method::POST, "/apply/reject") => (StatusCode::FORBIDDEN, "forbidden").into_response(),
        (Method::POST, "/interaction") => StatusCode::OK.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A base URL nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    drop(listener);
    format!("http://{addr}")
}

/// Minimal in-memory ledger for pipeline tests.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    pub applied: Arc<Mutex<HashSet<PostingId>>>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLedger {
    pub fn with_applied(ids: &[&str]) -> Self {
        let ledger = Self::default();
        ledger
            .applied
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| PostingId::from(*id)));
        ledger
    }
}

impl Ledger for MemoryLedger {
    async fn is_applied(&self, posting_id: &PostingId) -> bool {
        self.applied.lock().unwrap().contains(posting_id)
    }

    async fn mark_applied(&self, posting_id: &PostingId) -> Result<(), AppError> {
        self.applied.lock().unwrap().insert(posting_id.clone());
        Ok(())
    }

    async fn append_log(&self, entry: &LogEntry) {
        self.logs.lock().unwrap().push(entry.clone());
    }

    async fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.logs.lock().unwrap().iter().rev().take(limit).cloned().collect()
    }

    async fn applied_count(&self) -> u64 {
        self.applied.lock().unwrap().len() as u64
    }
}
