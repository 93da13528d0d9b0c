//! Structured error handling for upload operations.

use serde_json::Value;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Message carried by the error returned when no file was supplied.
pub const MISSING_FILE_MESSAGE: &str = "no file provided";

/// Message used when neither the response body nor the transport describe a failure.
pub const FALLBACK_MESSAGE: &str = "request error";

/// Categories of errors that can occur in upload operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request did not carry a file. Raised before any network activity.
    MissingFile,
    /// A header, URL or part of the request could not be encoded.
    InvalidInput,
    /// The server answered with a non-success status code.
    Status,
    /// The request did not complete within the transport timeout.
    Timeout,
    /// Connection or protocol failure without a usable response.
    Network,
    /// The uploader or transport is not set up correctly.
    Configuration,
    /// Reading the file contents failed.
    Io,
    /// Unknown error occurred.
    #[default]
    Unknown,
}

/// Normalized upload error.
///
/// Every failure surfaces as this type with a human-readable [`message`].
/// Transport specific details that do not fit the message (response headers,
/// protocol state) are not preserved; the original error is kept only as the
/// [`source`] for debugging.
///
/// [`message`]: Error::message
/// [`source`]: std::error::Error::source
#[must_use]
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// HTTP status code, for [`ErrorKind::Status`] errors.
    pub status: Option<u16>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates the error returned when the request has no file attached.
    pub fn missing_file() -> Self {
        Self::new(ErrorKind::MissingFile, MISSING_FILE_MESSAGE)
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Creates an error from a failed transport exchange.
    ///
    /// The message is taken from the first available of: the `message` field
    /// of the response body, the transport's own description, and finally
    /// [`FALLBACK_MESSAGE`].
    pub fn normalized(
        kind: ErrorKind,
        body: Option<&Value>,
        description: Option<&str>,
    ) -> Self {
        Self::new(kind, normalize_message(body, description))
    }

    /// Records the HTTP status code of the failed response.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, error.to_string()).with_source(error)
    }
}

/// Picks the message for a failed exchange.
///
/// A body `message` field wins when it is truthy: a non-empty string, a
/// non-zero number, `true`, or any array or object. Otherwise a non-empty
/// transport description is used, falling back to [`FALLBACK_MESSAGE`].
pub fn normalize_message(body: Option<&Value>, description: Option<&str>) -> String {
    body.and_then(|body| body.get("message"))
        .and_then(truthy_text)
        .or_else(|| {
            description
                .filter(|description| !description.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_owned())
}

fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_owned()),
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
