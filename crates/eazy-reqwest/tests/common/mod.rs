//! In-process upload server for integration tests.
//!
//! `/api/upload` behaves like the reference upload endpoint: it stores the
//! `file` field and answers `{url, filename}`, or `400 {message}` for an
//! empty file. The other routes script specific server behaviors.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use eazy_reqwest::{ReqwestConfig, ReqwestTransport};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once; controlled by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Clone, Default)]
struct ServerState {
    hits: Arc<AtomicUsize>,
}

/// Running test server.
pub struct TestServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// Starts a server on an ephemeral local port.
    pub async fn spawn() -> anyhow::Result<Self> {
        init_tracing();

        let state = ServerState::default();
        let hits = state.hits.clone();
        let app = Router::new()
            .route("/api/upload", post(store))
            .route("/api/echo", post(echo))
            .route("/api/id", post(id))
            .route("/api/plain", post(plain))
            .route("/api/disk-full", post(disk_full))
            .route("/api/bad-gateway", post(bad_gateway))
            .route("/api/slow", post(slow))
            .layer(DefaultBodyLimit::disable())
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, hits })
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Number of requests that reached a handler.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Transport pointed at this server with the default timeout.
    pub fn transport(&self) -> anyhow::Result<ReqwestTransport> {
        Ok(ReqwestTransport::new(ReqwestConfig::new(self.base_url())?)?)
    }

    /// Transport pointed at this server with a custom timeout.
    pub fn transport_with_timeout(&self, timeout_ms: u64) -> anyhow::Result<ReqwestTransport> {
        let config = ReqwestConfig::new(self.base_url())?.with_timeout_ms(timeout_ms);
        Ok(ReqwestTransport::new(config)?)
    }
}

/// Multipart form as the server received it.
#[derive(Debug, Default)]
struct ReceivedForm {
    field_names: Vec<String>,
    texts: Vec<(String, String)>,
    file_name: Option<String>,
    file_size: Option<usize>,
}

async fn read_form(state: &ServerState, mut multipart: Multipart) -> Result<ReceivedForm, Response> {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let mut form = ReceivedForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_owned();
        form.field_names.push(name.clone());

        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let bytes = field.bytes().await.map_err(bad_request)?;
                form.file_name = Some(file_name);
                form.file_size = Some(bytes.len());
            }
            None => {
                let value = field.text().await.map_err(bad_request)?;
                form.texts.push((name, value));
            }
        }
    }

    Ok(form)
}

fn bad_request(error: impl std::fmt::Display) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": error.to_string() })),
    )
        .into_response()
}

async fn store(State(state): State<ServerState>, multipart: Multipart) -> Response {
    let form = match read_form(&state, multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let file_index = form.field_names.iter().position(|name| name == "file");
    match (file_index, form.file_size) {
        (Some(_), Some(size)) if size > 0 => {}
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "file is empty" })),
            )
                .into_response();
        }
    }

    let extension = form
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| format!(".{ext}"))
        .unwrap_or_default();
    let filename = format!("{}{extension}", uuid::Uuid::new_v4().simple());

    Json(json!({ "url": format!("/files/{filename}"), "filename": filename })).into_response()
}

async fn echo(State(state): State<ServerState>, headers: HeaderMap, multipart: Multipart) -> Response {
    let form = match read_form(&state, multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    let content_types: Vec<String> = headers
        .get_all(header::CONTENT_TYPE)
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_owned))
        .collect();

    Json(json!({
        "fields": form.field_names,
        "texts": form.texts,
        "file_name": form.file_name,
        "file_size": form.file_size,
        "content_types": content_types,
        "x_client": header_text("x-client"),
        "cookie": header_text("cookie"),
    }))
    .into_response()
}

async fn id(State(state): State<ServerState>, multipart: Multipart) -> Response {
    match read_form(&state, multipart).await {
        Ok(_) => Json(json!({ "id": 42 })).into_response(),
        Err(response) => response,
    }
}

async fn plain(State(state): State<ServerState>, multipart: Multipart) -> Response {
    match read_form(&state, multipart).await {
        Ok(_) => "stored".into_response(),
        Err(response) => response,
    }
}

async fn disk_full(State(state): State<ServerState>, multipart: Multipart) -> Response {
    match read_form(&state, multipart).await {
        Ok(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "disk full" })),
        )
            .into_response(),
        Err(response) => response,
    }
}

async fn bad_gateway(State(state): State<ServerState>, multipart: Multipart) -> Response {
    match read_form(&state, multipart).await {
        Ok(_) => (StatusCode::BAD_GATEWAY, "<html>upstream unavailable</html>").into_response(),
        Err(response) => response,
    }
}

async fn slow(State(state): State<ServerState>, multipart: Multipart) -> Response {
    let _ = read_form(&state, multipart).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "late": true })).into_response()
}

/// Parses a payload field as a list of strings.
pub fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}
