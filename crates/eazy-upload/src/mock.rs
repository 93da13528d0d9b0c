//! Mock transport for testing.
//!
//! The [`MockTransport`] records every request it receives, replays scripted
//! progress ticks and answers with a scripted [`MockResponse`], so uploader
//! behavior can be checked without a network.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! eazy-upload = { version = "...", features = ["test-utils"] }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use crate::payload::PayloadPart;
use crate::transport::{Transport, TransportRequest};
use crate::{Error, ErrorKind, Result, UploadResult};

/// Scripted outcome of a mock request.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Resolve with the given payload.
    Success(Value),
    /// Fail with a normalized error built from the body and description.
    Failure {
        /// Error kind.
        kind: ErrorKind,
        /// Failure response body.
        body: Option<Value>,
        /// Transport description of the failure.
        description: Option<String>,
    },
}

impl MockResponse {
    /// Creates a successful response.
    pub fn success(payload: Value) -> Self {
        Self::Success(payload)
    }

    /// Creates a failed response.
    pub fn failure(kind: ErrorKind, body: Option<Value>, description: Option<&str>) -> Self {
        Self::Failure {
            kind,
            body,
            description: description.map(str::to_owned),
        }
    }

    fn resolve(&self) -> Result<UploadResult> {
        match self {
            Self::Success(payload) => Ok(UploadResult::new(payload.clone())),
            Self::Failure {
                kind,
                body,
                description,
            } => Err(Error::normalized(
                *kind,
                body.as_ref(),
                description.as_deref(),
            )),
        }
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::Success(Value::Null)
    }
}

/// What the mock transport saw of one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request identifier assigned by the uploader.
    pub request_id: Uuid,
    /// Destination path.
    pub url: String,
    /// Merged request headers.
    pub headers: HashMap<String, String>,
    /// Field names of every part, in send order.
    pub field_names: Vec<String>,
    /// Text fields, in send order.
    pub text_fields: Vec<(String, String)>,
    /// File name of the file part, if set on the source.
    pub file_name: Option<String>,
    /// Size of the file part, if known without opening it.
    pub file_length: Option<u64>,
    /// Whether credentials were requested.
    pub with_credentials: bool,
    /// Whether a progress handler was attached.
    pub has_progress_handler: bool,
}

impl RecordedRequest {
    fn record(request: &TransportRequest) -> Self {
        let mut text_fields = Vec::new();
        let mut file_name = None;
        let mut file_length = None;

        for part in request.payload.parts() {
            match part {
                PayloadPart::Text { name, value } => {
                    text_fields.push((name.clone(), value.clone()));
                }
                PayloadPart::File { source, .. } => {
                    file_name = source.file_name().map(str::to_owned);
                    file_length = source.known_length();
                }
            }
        }

        Self {
            request_id: request.request_id,
            url: request.url.clone(),
            headers: request.headers.clone(),
            field_names: request
                .payload
                .field_names()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            text_fields,
            file_name,
            file_length,
            with_credentials: request.with_credentials,
            has_progress_handler: request.on_upload_progress.is_some(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    response: MockResponse,
    ticks: Vec<(u64, Option<u64>)>,
    requests: Vec<RecordedRequest>,
}

/// In-memory [`Transport`] that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a mock that resolves every request with `null`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response returned for every request.
    pub fn respond_with(self, response: MockResponse) -> Self {
        self.lock().response = response;
        self
    }

    /// Sets the `(loaded, total)` ticks replayed before responding.
    pub fn with_ticks(self, ticks: Vec<(u64, Option<u64>)>) -> Self {
        self.lock().ticks = ticks;
        self
    }

    /// Returns the number of requests received.
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Returns every request received, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.lock().requests.last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the recorded requests.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: TransportRequest) -> Result<UploadResult> {
        let (ticks, response) = {
            let mut state = self.lock();
            state.requests.push(RecordedRequest::record(&request));
            (state.ticks.clone(), state.response.clone())
        };

        if let Some(handler) = &request.on_upload_progress {
            for (loaded, total) in ticks {
                handler.tick(loaded, total);
            }
        }

        response.resolve()
    }
}
