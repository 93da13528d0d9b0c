//! Opt-in process-wide uploader.
//!
//! Hosts that want callers without an [`Uploader`] handle to upload files
//! call [`install`] once during startup. Nothing is registered implicitly.

use std::sync::OnceLock;

use crate::{Error, Result, TRACING_TARGET, UploadRequest, UploadResult, Uploader};

static UPLOADER: OnceLock<Uploader> = OnceLock::new();

/// Installs the process-wide uploader.
///
/// # Errors
///
/// Returns a configuration error if an uploader is already installed.
pub fn install(uploader: Uploader) -> Result<()> {
    UPLOADER
        .set(uploader)
        .map_err(|_| Error::configuration("an uploader is already installed"))?;

    tracing::debug!(target: TRACING_TARGET, "Process-wide uploader installed");
    Ok(())
}

/// Returns the process-wide uploader, if one was installed.
pub fn installed() -> Option<&'static Uploader> {
    UPLOADER.get()
}

/// Uploads a file through the process-wide uploader.
///
/// # Errors
///
/// Returns a configuration error if no uploader is installed, and otherwise
/// whatever [`Uploader::upload_file`] returns.
pub async fn upload_file(request: UploadRequest) -> Result<UploadResult> {
    let uploader = installed().ok_or_else(|| Error::configuration("no uploader is installed"))?;
    uploader.upload_file(request).await
}
