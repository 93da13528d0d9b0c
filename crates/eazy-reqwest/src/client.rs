//! Reqwest-based upload transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eazy_upload::{Error, Result, Transport, TransportRequest, UploadResult, Uploader};
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::body::build_form;
use crate::interceptor::{intercept_error, intercept_response};
use crate::{ReqwestConfig, TRACING_TARGET};

/// Inner transport state shared between clones.
struct ReqwestTransportInner {
    /// Client that never sends or stores cookies.
    http: Client,
    /// Client attached to the cookie jar, used when credentials are requested.
    credentialed: Client,
    jar: Arc<Jar>,
    config: ReqwestConfig,
}

/// Reqwest-based [`Transport`] for uploads.
///
/// The transport is configured once with a base URL and timeout; every
/// request is a `POST` resolved against that base. Credentials (cookies from
/// the transport's [`Jar`]) are only sent for requests that ask for them.
///
/// # Examples
///
/// ```rust,ignore
/// use eazy_reqwest::{ReqwestConfig, ReqwestTransport};
///
/// let config = ReqwestConfig::new("http://localhost:8080/")?;
/// let transport = ReqwestTransport::new(config)?;
///
/// let uploader = transport.into_uploader();
/// ```
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: Arc<ReqwestTransportInner>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Creates a new transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP clients cannot be created.
    pub fn new(config: ReqwestConfig) -> Result<Self> {
        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET,
            base_url = %config.base_url,
            timeout_ms = timeout.as_millis(),
            "Creating upload transport"
        );

        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .build()
            .map_err(client_error)?;
        let credentialed = Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .cookie_provider(jar.clone())
            .build()
            .map_err(client_error)?;

        let inner = ReqwestTransportInner {
            http,
            credentialed,
            jar,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Creates a new transport with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ReqwestConfig::default())
    }

    /// Gets the transport configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }

    /// Gets the cookie jar used for requests sent with credentials.
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.inner.jar
    }

    /// Converts this transport into an [`Uploader`].
    pub fn into_uploader(self) -> Uploader {
        Uploader::new(self)
    }

    fn timeout(&self) -> Duration {
        self.inner.config.effective_timeout()
    }

    fn client(&self, with_credentials: bool) -> &Client {
        if with_credentials {
            &self.inner.credentialed
        } else {
            &self.inner.http
        }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn request(&self, request: TransportRequest) -> Result<UploadResult> {
        let started_at = Instant::now();
        let url = self.config().resolve(&request.url)?;

        let form = build_form(request.payload, request.on_upload_progress).await?;
        let headers = header_map(&request.headers, form.boundary())?;

        tracing::debug!(
            target: TRACING_TARGET,
            request_id = %request.request_id,
            url = %url,
            with_credentials = request.with_credentials,
            "Sending upload request"
        );

        // Replacing the headers after `multipart` keeps a single content type.
        let result = self
            .client(request.with_credentials)
            .post(url)
            .multipart(form)
            .headers(headers)
            .send()
            .await;

        let outcome = match result {
            Ok(response) => intercept_response(response, self.timeout()).await,
            Err(error) => Err(intercept_error(error, self.timeout())),
        };

        match &outcome {
            Ok(_) => tracing::debug!(
                target: TRACING_TARGET,
                request_id = %request.request_id,
                elapsed_ms = started_at.elapsed().as_millis(),
                "Upload request completed"
            ),
            Err(error) => tracing::debug!(
                target: TRACING_TARGET,
                request_id = %request.request_id,
                kind = %error.kind,
                status = ?error.status,
                elapsed_ms = started_at.elapsed().as_millis(),
                "Upload request failed"
            ),
        }

        outcome
    }
}

fn client_error(error: reqwest::Error) -> Error {
    Error::configuration(format!("Failed to build HTTP client: {error}")).with_source(error)
}

/// Converts merged request headers, attaching the boundary to the content type.
fn header_map(
    headers: &HashMap<String, String>,
    boundary: &str,
) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_input(format!("Invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| Error::invalid_input(format!("Invalid header value '{value}': {e}")))?;
        map.insert(header_name, header_value);
    }

    let content_type = HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))
        .map_err(|e| Error::invalid_input(format!("Invalid multipart boundary: {e}")))?;
    map.insert(CONTENT_TYPE, content_type);

    Ok(map)
}
