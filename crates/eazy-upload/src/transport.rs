//! Transport abstraction used by the uploader.

use std::collections::HashMap;

use uuid::Uuid;

use crate::payload::MultipartPayload;
use crate::progress::TickHandler;
use crate::{Result, UploadResult};

/// A fully prepared upload request handed to a [`Transport`].
#[derive(Debug)]
pub struct TransportRequest {
    /// Identifier used to correlate log events of one upload.
    pub request_id: Uuid,
    /// Destination path, resolved against the transport's base URL.
    pub url: String,
    /// Request headers, already merged with the multipart content type.
    pub headers: HashMap<String, String>,
    /// Multipart body parts in send order.
    pub payload: MultipartPayload,
    /// Whether credentials are sent with the request.
    pub with_credentials: bool,
    /// Receives raw progress ticks while the body is sent.
    pub on_upload_progress: Option<TickHandler>,
}

/// Core trait for issuing upload requests.
///
/// Implementations send a `POST` with the multipart payload and reshape the
/// exchange: a successful response resolves to its body payload, every
/// failure resolves to a normalized [`Error`](crate::Error).
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the unwrapped response payload.
    async fn request(&self, request: TransportRequest) -> Result<UploadResult>;
}
