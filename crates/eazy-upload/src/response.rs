//! Upload result types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload returned by the server for a successful upload.
///
/// The payload is passed through exactly as the transport produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadResult(Value);

impl UploadResult {
    /// Wraps a response payload.
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Returns the payload.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the result, returning the payload.
    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Deserializes the payload into a typed value.
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.0)
    }
}

impl From<Value> for UploadResult {
    fn from(payload: Value) -> Self {
        Self(payload)
    }
}

impl From<UploadResult> for Value {
    fn from(result: UploadResult) -> Self {
        result.0
    }
}

/// Success body of the reference upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Relative URL the stored file is served from.
    pub url: String,
    /// Name the server stored the file under.
    pub filename: String,
}
