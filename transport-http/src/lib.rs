//! HTTP Byte Transport using Reqwest
//!
//! Implements [`ByteTransport`] over HTTP/HTTPS:
//! - Resumable transfers via `Range: bytes=N-` requests
//! - Total-length discovery from `Content-Length` / `Content-Range`
//! - Metadata-only probes via `HEAD`
//! - Optional inline-metadata negotiation (`Icy-MetaData: 1`)
//! - Redirect following, connect timeout, proxy, custom User-Agent

mod headers;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, RANGE};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use transport_traits::{ByteStream, ByteTransport, Result, TransferInfo, TransferRequest, TransportError};

const DEFAULT_USER_AGENT: &str = concat!("stream-vfs/", env!("CARGO_PKG_VERSION"), " (http transport)");

/// Proxy settings for outbound transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    /// Basic auth credentials as (user, password).
    pub auth: Option<(String, String)>,
}

/// Builder for [`HttpTransport`].
pub struct HttpTransportBuilder {
    connect_timeout: Duration,
    user_agent: String,
    follow_redirects: bool,
    proxy: Option<ProxyConfig>,
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_redirects: true,
            proxy: None,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let redirect = if self.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent)
            .redirect(redirect);

        if let Some(proxy) = self.proxy {
            let url = format!("http://{}:{}", proxy.host, proxy.port);
            let mut p = reqwest::Proxy::all(&url)
                .map_err(|e| TransportError::ConnectFailed(format!("Invalid proxy {}: {}", url, e)))?;
            if let Some((user, pass)) = proxy.auth {
                p = p.basic_auth(&user, &pass);
            }
            builder = builder.proxy(p);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::ConnectFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpTransport { client })
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reqwest-based byte transport.
///
/// Connection pooling, TLS, and redirects come from the shared
/// [`reqwest::Client`]; one `HttpTransport` can serve any number of
/// concurrent transfers.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self> {
        HttpTransportBuilder::new().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Create a transport from a pre-configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_headers(request: &TransferRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if request.inline_metadata {
            headers.insert("Icy-MetaData", HeaderValue::from_static("1"));
        }
        for (key, value) in &request.headers {
            if let (Ok(k), Ok(v)) = (
                reqwest::header::HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(k, v);
            } else {
                warn!(header = %key, "Skipping invalid request header");
            }
        }
        headers
    }

    fn map_send_error(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::ConnectFailed("Connection timed out".to_string())
        } else if e.is_connect() {
            TransportError::ConnectFailed(format!("Connection failed: {}", e))
        } else {
            TransportError::ConnectFailed(e.to_string())
        }
    }
}

#[async_trait]
impl ByteTransport for HttpTransport {
    async fn begin(&self, request: TransferRequest) -> Result<Box<dyn ByteStream>> {
        let mut req = self
            .client
            .request(Method::GET, &request.url)
            .headers(Self::build_headers(&request));

        if request.resume_from > 0 {
            req = req.header(RANGE, format!("bytes={}-", request.resume_from));
        }
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        debug!(url = %request.url, resume_from = request.resume_from, "Starting transfer");

        let response = req.send().await.map_err(Self::map_send_error)?;
        let status = response.status();

        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }
        if request.resume_from > 0 && status != StatusCode::PARTIAL_CONTENT {
            // The server replayed the resource from byte zero; delivering it
            // would corrupt the caller's absolute offsets.
            warn!(url = %request.url, "Range request ignored by server");
            return Err(TransportError::RangeNotSupported);
        }

        let info = headers::extract_info(response.headers(), status, request.resume_from);
        debug!(
            total_length = ?info.total_length,
            metadata_interval = ?info.metadata_interval,
            "Transfer established"
        );

        let stream = response.bytes_stream().boxed();
        Ok(Box::new(HttpByteStream { info, stream }))
    }

    async fn probe(&self, url: &str) -> Result<TransferInfo> {
        debug!(url = %url, "Probing for length");
        let response = self
            .client
            .request(Method::HEAD, url)
            .send()
            .await
            .map_err(|e| {
                // Live-stream servers often drop HEAD requests on the floor
                // rather than answering them.
                if e.is_connect() || e.is_timeout() {
                    Self::map_send_error(e)
                } else {
                    TransportError::ProbeUnsupported
                }
            })?;

        let status = response.status();
        if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED {
            return Err(TransportError::ProbeUnsupported);
        }
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        Ok(headers::extract_info(response.headers(), status, 0))
    }
}

struct HttpByteStream {
    info: TransferInfo,
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
}

#[async_trait]
impl ByteStream for HttpByteStream {
    fn info(&self) -> &TransferInfo {
        &self.info
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self.stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(TransportError::TransferInterrupted(e.to_string())),
            None => Ok(None),
        }
    }
}
