#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod uploader;

pub mod payload;
pub mod progress;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use error::{
    BoxedError, Error, ErrorKind, FALLBACK_MESSAGE, MISSING_FILE_MESSAGE, Result,
    normalize_message,
};
pub use payload::{MultipartPayload, PayloadPart};
pub use progress::{ProgressEvent, ProgressHandler, ProgressTick, TickHandler};
pub use request::{FileBody, FileSource, FormFields, UploadRequest};
pub use response::{StoredFile, UploadResult};
pub use transport::{Transport, TransportRequest};
pub use uploader::{UploadState, Uploader};

/// Tracing target for upload operations.
pub const TRACING_TARGET: &str = "eazy_upload::uploader";
