//! Upload request and file source types.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use mime::Mime;
use tokio_util::io::ReaderStream;

use crate::progress::{ProgressEvent, ProgressHandler};

/// Default destination path for uploads.
pub const DEFAULT_UPLOAD_URL: &str = "/api/upload";

/// Default multipart field name for the file part.
pub const DEFAULT_FIELD_NAME: &str = "file";

/// File name sent for sources that do not carry one.
pub const DEFAULT_FILE_NAME: &str = "blob";

/// Size of the chunks in-memory sources are split into while sending.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A stream of file contents.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A single upload request.
///
/// Built with [`UploadRequest::new`] and the `with_*` methods; every field
/// other than the file has a default.
pub struct UploadRequest {
    /// File to upload. A request without a file fails before any network activity.
    pub file: Option<FileSource>,
    /// Destination path, resolved against the transport's base URL.
    pub url: String,
    /// Multipart field name of the file part.
    pub field_name: String,
    /// Additional request headers. `Content-Type` is always overridden.
    pub headers: HashMap<String, String>,
    /// Additional multipart fields, sent before the file in insertion order.
    pub extra_data: FormFields,
    /// Whether to send credentials (cookies) with the request.
    pub with_credentials: bool,
    /// Receives progress events while the file is sent.
    pub on_progress: Option<ProgressHandler>,
}

impl Default for UploadRequest {
    fn default() -> Self {
        Self {
            file: None,
            url: DEFAULT_UPLOAD_URL.to_owned(),
            field_name: DEFAULT_FIELD_NAME.to_owned(),
            headers: HashMap::new(),
            extra_data: FormFields::new(),
            with_credentials: false,
            on_progress: None,
        }
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("file", &self.file)
            .field("url", &self.url)
            .field("field_name", &self.field_name)
            .field("headers", &self.headers)
            .field("extra_data", &self.extra_data)
            .field("with_credentials", &self.with_credentials)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl UploadRequest {
    /// Creates a request with default settings and no file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file to upload.
    pub fn with_file(mut self, file: FileSource) -> Self {
        self.file = Some(file);
        self
    }

    /// Sets the destination path.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the multipart field name of the file part.
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    /// Adds a custom header to the request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets multiple custom headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Adds an extra multipart field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_data.insert(name, value);
        self
    }

    /// Sets whether credentials are sent with the request.
    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    /// Sets the progress handler.
    pub fn on_progress<F>(mut self, handler: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.on_progress = Some(ProgressHandler::new(handler));
        self
    }
}

/// Ordered text fields of a multipart form.
///
/// Keys are unique: inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    entries: Vec<(String, String)>,
}

impl FormFields {
    /// Creates an empty set of fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, keeping the original position of an existing key.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns the value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FormFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

impl IntoIterator for FormFields {
    type IntoIter = std::vec::IntoIter<(String, String)>;
    type Item = (String, String);

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Where the file contents come from.
pub struct FileSource {
    kind: SourceKind,
    file_name: Option<String>,
    mime: Option<Mime>,
}

enum SourceKind {
    Bytes(Bytes),
    Path(PathBuf),
    Stream {
        stream: ByteStream,
        length: Option<u64>,
    },
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("FileSource");
        match &self.kind {
            SourceKind::Bytes(bytes) => debug.field("bytes", &bytes.len()),
            SourceKind::Path(path) => debug.field("path", path),
            SourceKind::Stream { length, .. } => debug.field("stream_length", length),
        };
        debug
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .finish()
    }
}

impl FileSource {
    fn with_kind(kind: SourceKind) -> Self {
        Self {
            kind,
            file_name: None,
            mime: None,
        }
    }

    /// Uploads an in-memory buffer.
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self::with_kind(SourceKind::Bytes(bytes.into()))
    }

    /// Uploads a file from disk. The file is opened when the request is sent.
    ///
    /// The file name defaults to the last component of the path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Self {
            file_name,
            ..Self::with_kind(SourceKind::Path(path))
        }
    }

    /// Uploads a stream of chunks.
    ///
    /// Without a known `length` no progress events are reported.
    pub fn stream(stream: ByteStream, length: Option<u64>) -> Self {
        Self::with_kind(SourceKind::Stream { stream, length })
    }

    /// Sets the file name sent with the part.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the MIME type sent with the part.
    pub fn with_mime(mut self, mime: Mime) -> Self {
        self.mime = Some(mime);
        self
    }

    /// Returns the file name, if one is set.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Returns the path for sources read from disk.
    pub fn as_path(&self) -> Option<&Path> {
        match &self.kind {
            SourceKind::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the size when it is known without opening the source.
    pub fn known_length(&self) -> Option<u64> {
        match &self.kind {
            SourceKind::Bytes(bytes) => Some(bytes.len() as u64),
            SourceKind::Path(_) => None,
            SourceKind::Stream { length, .. } => *length,
        }
    }

    /// Opens the source for sending.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a path source cannot be opened.
    pub async fn open(self) -> std::io::Result<FileBody> {
        let Self {
            kind,
            file_name,
            mime,
        } = self;

        let (stream, length) = match kind {
            SourceKind::Bytes(bytes) => {
                let length = bytes.len() as u64;
                (chunked(bytes), Some(length))
            }
            SourceKind::Path(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let length = file.metadata().await?.len();
                (ReaderStream::with_capacity(file, CHUNK_SIZE).boxed(), Some(length))
            }
            SourceKind::Stream { stream, length } => (stream, length),
        };

        Ok(FileBody {
            stream,
            length,
            file_name: file_name.unwrap_or_else(|| DEFAULT_FILE_NAME.to_owned()),
            mime: mime.unwrap_or(mime::APPLICATION_OCTET_STREAM),
        })
    }
}

/// An opened file source, ready to be written into a request body.
pub struct FileBody {
    /// File contents.
    pub stream: ByteStream,
    /// Total size in bytes, if known.
    pub length: Option<u64>,
    /// File name sent with the part.
    pub file_name: String,
    /// MIME type sent with the part.
    pub mime: Mime,
}

impl fmt::Debug for FileBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBody")
            .field("length", &self.length)
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .finish_non_exhaustive()
    }
}

fn chunked(bytes: Bytes) -> ByteStream {
    let len = bytes.len();
    let chunks = (0..len)
        .step_by(CHUNK_SIZE)
        .map(move |start| Ok(bytes.slice(start..(start + CHUNK_SIZE).min(len))));
    stream::iter(chunks.collect::<Vec<_>>()).boxed()
}
