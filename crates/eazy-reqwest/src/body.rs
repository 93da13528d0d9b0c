//! Multipart form assembly with metered file parts.

use bytes::Bytes;
use eazy_upload::{Error, MultipartPayload, PayloadPart, Result, TickHandler};
use futures_util::TryStreamExt;
use reqwest::Body;
use reqwest::multipart::{Form, Part};

use crate::TRACING_TARGET;

/// Builds the reqwest form for a payload, keeping the part order.
///
/// File parts report every chunk pulled by the connection to `progress`.
pub(crate) async fn build_form(
    payload: MultipartPayload,
    progress: Option<TickHandler>,
) -> Result<Form> {
    let mut form = Form::new();

    for part in payload {
        form = match part {
            PayloadPart::Text { name, value } => form.text(name, value),
            PayloadPart::File { name, source } => {
                let part = file_part(source, progress.clone()).await?;
                form.part(name, part)
            }
        };
    }

    Ok(form)
}

async fn file_part(source: eazy_upload::FileSource, progress: Option<TickHandler>) -> Result<Part> {
    let file = source.open().await?;
    let total = file.length;

    tracing::trace!(
        target: TRACING_TARGET,
        file_name = %file.file_name,
        mime = %file.mime,
        length = ?total,
        "Opened file part"
    );

    let mut loaded = 0u64;
    let metered = file.stream.inspect_ok(move |chunk: &Bytes| {
        loaded += chunk.len() as u64;
        if let Some(progress) = &progress {
            progress.tick(loaded, total);
        }
    });

    let body = Body::wrap_stream(metered);
    let part = match total {
        Some(length) => Part::stream_with_length(body, length),
        None => Part::stream(body),
    };

    part.file_name(file.file_name)
        .mime_str(file.mime.as_ref())
        .map_err(|e| Error::invalid_input(format!("Invalid MIME type '{}': {}", file.mime, e)))
}
