//! Response interceptors.
//!
//! Every exchange ends in one of two shapes: the unwrapped body payload of a
//! successful response, or a normalized [`Error`] whose message prefers the
//! server's `message` field over the transport's own description.

use std::time::Duration;

use eazy_upload::{Error, ErrorKind, Result, UploadResult};
use reqwest::{Response, StatusCode};
use serde_json::Value;

use crate::TRACING_TARGET;

/// Unwraps a response into its payload, or rejects it if the status is not 2xx.
pub(crate) async fn intercept_response(response: Response, timeout: Duration) -> Result<UploadResult> {
    let status = response.status();

    let text = match response.text().await {
        Ok(text) => text,
        Err(error) => return Err(intercept_error(error, timeout)),
    };

    if status.is_success() {
        return Ok(UploadResult::new(parse_payload(text)));
    }

    tracing::debug!(
        target: TRACING_TARGET,
        status = status.as_u16(),
        body_len = text.len(),
        "Upload rejected by server"
    );

    Err(reject_status(status, &text))
}

/// Normalizes a transport failure that produced no usable response.
pub(crate) fn intercept_error(error: reqwest::Error, timeout: Duration) -> Error {
    if let Some(status) = error.status() {
        return Error::normalized(ErrorKind::Status, None, Some(&status_description(status)))
            .with_status(status.as_u16())
            .with_source(error);
    }

    let (kind, description) = if error.is_timeout() {
        (ErrorKind::Timeout, timeout_description(timeout))
    } else if error.is_builder() {
        (ErrorKind::InvalidInput, error.to_string())
    } else {
        (ErrorKind::Network, error.to_string())
    };

    Error::normalized(kind, None, Some(&description)).with_source(error)
}

fn reject_status(status: StatusCode, text: &str) -> Error {
    let body = serde_json::from_str::<Value>(text).ok();
    Error::normalized(
        ErrorKind::Status,
        body.as_ref(),
        Some(&status_description(status)),
    )
    .with_status(status.as_u16())
}

/// Parses a body as JSON, falling back to the raw text.
fn parse_payload(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn status_description(status: StatusCode) -> String {
    format!("Request failed with status code {}", status.as_u16())
}

fn timeout_description(timeout: Duration) -> String {
    format!("timeout of {}ms exceeded", timeout.as_millis())
}
