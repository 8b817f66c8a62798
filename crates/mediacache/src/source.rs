//! Remote source sessions and their persisted metadata.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes};
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use reqwest::{Client, Response, StatusCode, header};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use crate::config::Config;
use crate::error::EngineError;
use crate::fetch::{self, ByteRange};
use crate::headers::HeaderInjector;

/// Timeout bounding the best-effort metadata probe.
const METADATA_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable metadata record for a remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub url: String,
    /// Full resource length in bytes; `None` while unknown.
    pub length: Option<u64>,
    pub mime: Option<String>,
}

impl SourceInfo {
    /// Record for a URL nothing is known about yet.
    pub fn unknown(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            length: None,
            mime: None,
        }
    }
}

/// Key-value store for source metadata, keyed by URL.
pub trait SourceInfoStorage: Send + Sync {
    fn get(&self, url: &str) -> Option<SourceInfo>;
    fn put(&self, url: &str, info: SourceInfo);
}

/// Storage that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSourceInfoStorage;

impl SourceInfoStorage for NoSourceInfoStorage {
    fn get(&self, _url: &str) -> Option<SourceInfo> {
        None
    }

    fn put(&self, _url: &str, _info: SourceInfo) {}
}

/// Process-local storage backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemorySourceInfoStorage {
    entries: Mutex<HashMap<String, SourceInfo>>,
}

impl SourceInfoStorage for InMemorySourceInfoStorage {
    fn get(&self, url: &str) -> Option<SourceInfo> {
        self.entries.lock().get(url).cloned()
    }

    fn put(&self, url: &str, info: SourceInfo) {
        self.entries.lock().insert(url.to_string(), info);
    }
}

/// Open response body with a cursor over its chunk stream.
struct BodyReader {
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
    chunk: Bytes,
    position: u64,
}

impl BodyReader {
    fn new(response: Response, position: u64) -> Self {
        Self {
            stream: response.bytes_stream().boxed(),
            chunk: Bytes::new(),
            position,
        }
    }
}

/// One remote-source session: a single `open`/`read`/`close` lifecycle over
/// an HTTP response, with redirects and partial-content arithmetic resolved
/// behind it.
///
/// Sessions are single-use and not meant to be shared between tasks; each
/// concurrent reader opens its own.
pub struct HttpSource {
    client: Client,
    storage: Arc<dyn SourceInfoStorage>,
    injector: Arc<dyn HeaderInjector>,
    cancel: CancellationToken,
    info: SourceInfo,
    body: Option<BodyReader>,
}

impl HttpSource {
    /// Create a session for `url`, seeding metadata from the storage when a
    /// previous session already observed this URL.
    pub fn new(
        client: Client,
        url: impl Into<String>,
        storage: Arc<dyn SourceInfoStorage>,
        injector: Arc<dyn HeaderInjector>,
    ) -> Self {
        let url = url.into();
        let info = storage.get(&url).unwrap_or_else(|| SourceInfo::unknown(&url));
        Self {
            client,
            storage,
            injector,
            cancel: CancellationToken::new(),
            info,
            body: None,
        }
    }

    /// Create a session wired with the metadata storage and header injector
    /// a [`Config`](crate::Config) carries.
    pub fn from_config(client: Client, url: impl Into<String>, config: &Config) -> Self {
        Self::new(
            client,
            url,
            config.source_info_storage.clone(),
            config.header_injector.clone(),
        )
    }

    /// Attach a token whose cancellation aborts in-flight reads.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn url(&self) -> &str {
        &self.info.url
    }

    /// Currently known metadata.
    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Known full resource length, probing the origin first when unknown.
    /// The probe is best-effort: on failure the previously known value (or
    /// `None`) is returned.
    pub async fn length(&mut self) -> Option<u64> {
        if self.info.length.is_none() {
            self.fetch_content_info().await;
        }
        self.info.length
    }

    /// Known MIME type, probing the origin first when unknown.
    pub async fn mime(&mut self) -> Option<String> {
        if self.info.mime.is_none() {
            self.fetch_content_info().await;
        }
        self.info.mime.clone()
    }

    /// Open a readable stream starting at `offset`.
    ///
    /// Returns `true` when the range attempt failed at the transport level
    /// and the session fell back to a full download from offset 0: bytes
    /// previously cached for this resource must then be overwritten, not
    /// appended to.
    #[instrument(skip(self), fields(url = %self.info.url), level = "debug")]
    pub async fn open(&mut self, offset: u64) -> Result<bool, EngineError> {
        let mut needs_overwrite = false;
        let first = fetch::send_request(
            &self.client,
            &self.info.url,
            ByteRange::From { offset },
            None,
            self.injector.as_ref(),
        )
        .await;

        let response = match first {
            Ok(response) => response,
            Err(err @ (EngineError::TooManyRedirects(_) | EngineError::UrlError(_))) => {
                return Err(err);
            }
            Err(err) => {
                debug!(error = %err, "range request failed, retrying as full download");
                needs_overwrite = true;
                fetch::send_request(
                    &self.client,
                    &self.info.url,
                    ByteRange::From { offset: 0 },
                    None,
                    self.injector.as_ref(),
                )
                .await?
            }
        };

        let mime = header_str(&response, header::CONTENT_TYPE);
        let length = self.resolve_length(&response, offset);
        let position = if response.status() == StatusCode::PARTIAL_CONTENT {
            offset
        } else {
            0
        };
        self.info = SourceInfo {
            url: self.info.url.clone(),
            length,
            mime,
        };
        self.storage.put(&self.info.url, self.info.clone());
        self.body = Some(BodyReader::new(response, position));
        Ok(needs_overwrite)
    }

    /// Full resource length implied by the response.
    ///
    /// A partial-content response declares the length of the requested range,
    /// so the request offset is added back. Any status other than 200/206
    /// carries no new information.
    fn resolve_length(&self, response: &Response, offset: u64) -> Option<u64> {
        let declared = content_length(response);
        match response.status() {
            StatusCode::OK => declared,
            StatusCode::PARTIAL_CONTENT => declared.map(|length| length + offset),
            _ => self.info.length,
        }
    }

    /// Read from the open stream into `buf`, returning the number of bytes
    /// read; 0 means end of stream.
    ///
    /// A read aborted by cancellation yields [`EngineError::Interrupted`],
    /// distinguishable from an ordinary transport failure.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, EngineError> {
        let url = self.info.url.clone();
        let Some(body) = self.body.as_mut() else {
            return Err(EngineError::NoActiveConnection { url });
        };
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if !body.chunk.is_empty() {
                let n = buf.len().min(body.chunk.len());
                buf[..n].copy_from_slice(&body.chunk[..n]);
                body.chunk.advance(n);
                body.position += n as u64;
                return Ok(n);
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(EngineError::Interrupted { url });
                }
                next = body.stream.next() => next,
            };
            match next {
                Some(Ok(chunk)) => body.chunk = chunk,
                Some(Err(err)) => return Err(EngineError::transport(url, body.position, err)),
                None => return Ok(0),
            }
        }
    }

    /// Release the underlying response. Safe to call at any time, including
    /// before `open` and repeatedly.
    pub fn close(&mut self) {
        if self.body.take().is_some() {
            debug!(url = %self.info.url, "connection closed");
        }
    }

    /// Probe the origin for length and MIME and persist the result.
    /// Best-effort: failures are logged and the previously known metadata
    /// stays in place.
    async fn fetch_content_info(&mut self) {
        debug!(url = %self.info.url, "reading content info");
        let probe = fetch::send_request(
            &self.client,
            &self.info.url,
            ByteRange::From { offset: 0 },
            Some(METADATA_PROBE_TIMEOUT),
            self.injector.as_ref(),
        )
        .await;

        match probe {
            Ok(response) => {
                self.info = SourceInfo {
                    url: self.info.url.clone(),
                    length: content_length(&response),
                    mime: header_str(&response, header::CONTENT_TYPE),
                };
                self.storage.put(&self.info.url, self.info.clone());
                debug!(info = ?self.info, "source info fetched");
                // the unread body is dropped with the response
            }
            Err(err) => {
                error!(url = %self.info.url, error = %err, "error fetching source info");
            }
        }
    }
}

fn content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn header_str(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
