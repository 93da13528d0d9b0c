//! Upload orchestration.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use strum::{AsRefStr, Display, IntoStaticStr};
use uuid::Uuid;

use crate::payload::{MultipartPayload, merge_headers};
use crate::progress::TickHandler;
use crate::transport::{Transport, TransportRequest};
use crate::{Error, Result, TRACING_TARGET, UploadRequest, UploadResult};

/// Lifecycle of a single upload call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UploadState {
    /// The call has not started.
    Idle,
    /// Checking the request preconditions.
    Validating,
    /// Assembling the multipart payload and headers.
    Building,
    /// Waiting for the transport.
    Sending,
    /// The server accepted the upload.
    Succeeded,
    /// The call failed, either locally or in the transport.
    Failed,
}

impl UploadState {
    /// Returns whether no further transitions can happen.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Uploads files through a [`Transport`].
///
/// Every call to [`upload_file`] issues at most one transport request and
/// keeps no state between calls. The transport is wrapped in `Arc` for cheap
/// cloning, so one uploader can serve concurrent uploads.
///
/// [`upload_file`]: Uploader::upload_file
#[derive(Clone)]
pub struct Uploader {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Uploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uploader").finish_non_exhaustive()
    }
}

impl Uploader {
    /// Creates a new uploader over the given transport.
    pub fn new<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Creates a new uploader over a shared transport.
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Uploads a file.
    ///
    /// Extra fields are sent before the file field, `Content-Type` is always
    /// `multipart/form-data`, and progress events are delivered to the
    /// request's handler whenever the transport knows the total size.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::MissingFile`](crate::ErrorKind::MissingFile)
    /// without touching the transport when the request has no file, and
    /// otherwise with the transport's normalized error, unchanged.
    pub async fn upload_file(&self, request: UploadRequest) -> Result<UploadResult> {
        let request_id = Uuid::now_v7();
        let mut state = UploadState::Idle;
        transition(request_id, &mut state, UploadState::Validating);

        let UploadRequest {
            file,
            url,
            field_name,
            headers,
            extra_data,
            with_credentials,
            on_progress,
        } = request;

        let Some(file) = file else {
            transition(request_id, &mut state, UploadState::Failed);
            tracing::warn!(
                target: TRACING_TARGET,
                request_id = %request_id,
                url = %url,
                "Upload rejected: no file provided"
            );
            return Err(Error::missing_file());
        };

        transition(request_id, &mut state, UploadState::Building);
        let field_count = extra_data.len();
        let transport_request = TransportRequest {
            request_id,
            url,
            headers: merge_headers(headers),
            payload: MultipartPayload::for_upload(extra_data, field_name, file),
            with_credentials,
            on_upload_progress: on_progress.map(TickHandler::translating),
        };

        tracing::debug!(
            target: TRACING_TARGET,
            request_id = %request_id,
            url = %transport_request.url,
            extra_fields = field_count,
            with_credentials,
            "Uploading file"
        );

        transition(request_id, &mut state, UploadState::Sending);
        let started_at = Instant::now();
        let result = self.transport.request(transport_request).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(_) => {
                transition(request_id, &mut state, UploadState::Succeeded);
                tracing::debug!(
                    target: TRACING_TARGET,
                    request_id = %request_id,
                    elapsed_ms = elapsed.as_millis(),
                    "Upload completed"
                );
            }
            Err(error) => {
                transition(request_id, &mut state, UploadState::Failed);
                tracing::warn!(
                    target: TRACING_TARGET,
                    request_id = %request_id,
                    kind = %error.kind,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Upload failed"
                );
            }
        }

        result
    }
}

fn transition(request_id: Uuid, state: &mut UploadState, next: UploadState) {
    debug_assert!(!state.is_terminal(), "upload already finished");
    tracing::trace!(
        target: TRACING_TARGET,
        request_id = %request_id,
        from = %state,
        to = %next,
        "Upload state changed"
    );
    *state = next;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::mock::{MockResponse, MockTransport};
    use crate::{ErrorKind, FileSource, ProgressEvent};

    #[tokio::test]
    async fn test_missing_file_never_reaches_transport() {
        let transport = MockTransport::new();
        let uploader = Uploader::new(transport.clone());

        let error = uploader
            .upload_file(UploadRequest::new().with_url("/api/upload"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::MissingFile);
        assert_eq!(error.message(), "no file provided");
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resolves_with_payload_unchanged() {
        let transport = MockTransport::new().respond_with(MockResponse::success(json!({ "id": 42 })));
        let uploader = Uploader::new(transport.clone());

        let blob = vec![0u8; 5 * 1024 * 1024];
        let result = uploader
            .upload_file(
                UploadRequest::new()
                    .with_file(FileSource::bytes(blob))
                    .with_url("/api/upload"),
            )
            .await
            .unwrap();

        assert_eq!(result.into_inner(), json!({ "id": 42 }));
        assert_eq!(transport.call_count(), 1);

        let recorded = transport.last_request().unwrap();
        assert_eq!(recorded.url, "/api/upload");
        assert_eq!(recorded.file_length, Some(5 * 1024 * 1024));
    }

    #[tokio::test]
    async fn test_transport_error_is_returned_as_is() {
        let transport = MockTransport::new().respond_with(MockResponse::failure(
            ErrorKind::Status,
            Some(json!({ "message": "disk full" })),
            Some("Request failed with status code 500"),
        ));
        let uploader = Uploader::new(transport);

        let error = uploader
            .upload_file(UploadRequest::new().with_file(FileSource::bytes("x")))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Status);
        assert_eq!(error.message(), "disk full");
    }

    #[tokio::test]
    async fn test_builds_ordered_payload_and_merged_headers() {
        let transport = MockTransport::new();
        let uploader = Uploader::new(transport.clone());

        uploader
            .upload_file(
                UploadRequest::new()
                    .with_file(FileSource::bytes("x"))
                    .with_field_name("attachment")
                    .with_field("folder", "docs")
                    .with_field("owner", "7")
                    .with_header("content-type", "application/json")
                    .with_header("X-Client", "picker")
                    .with_credentials(true),
            )
            .await
            .unwrap();

        let recorded = transport.last_request().unwrap();
        assert_eq!(recorded.field_names, vec!["folder", "owner", "attachment"]);
        assert_eq!(
            recorded.text_fields,
            vec![
                ("folder".to_owned(), "docs".to_owned()),
                ("owner".to_owned(), "7".to_owned()),
            ]
        );
        assert_eq!(recorded.headers["Content-Type"], "multipart/form-data");
        assert_eq!(recorded.headers["X-Client"], "picker");
        assert!(!recorded.headers.contains_key("content-type"));
        assert!(recorded.with_credentials);
    }

    #[tokio::test]
    async fn test_credentials_default_off() {
        let transport = MockTransport::new();
        let uploader = Uploader::new(transport.clone());

        uploader
            .upload_file(UploadRequest::new().with_file(FileSource::bytes("x")))
            .await
            .unwrap();

        assert!(!transport.last_request().unwrap().with_credentials);
    }

    #[tokio::test]
    async fn test_progress_translation() {
        let transport = MockTransport::new().with_ticks(vec![
            (0, None),
            (25, Some(100)),
            (50, None),
            (75, Some(100)),
            (100, Some(100)),
        ]);
        let uploader = Uploader::new(transport);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        uploader
            .upload_file(
                UploadRequest::new()
                    .with_file(FileSource::bytes("x"))
                    .on_progress(move |event| sink.lock().unwrap().push(event)),
            )
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                ProgressEvent { percent: 25, loaded: 25, total: 100 },
                ProgressEvent { percent: 75, loaded: 75, total: 100 },
                ProgressEvent { percent: 100, loaded: 100, total: 100 },
            ]
        );
    }

    #[tokio::test]
    async fn test_ticks_without_handler_are_dropped() {
        let transport = MockTransport::new().with_ticks(vec![(50, Some(100))]);
        let uploader = Uploader::new(transport.clone());

        let result = uploader
            .upload_file(UploadRequest::new().with_file(FileSource::bytes("x")))
            .await;

        assert!(result.is_ok());
        assert!(!transport.last_request().unwrap().has_progress_handler);
    }

    #[test]
    fn test_terminal_states() {
        assert!(UploadState::Succeeded.is_terminal());
        assert!(UploadState::Failed.is_terminal());
        assert!(!UploadState::Sending.is_terminal());
        assert_eq!(UploadState::Validating.to_string(), "validating");
    }
}
