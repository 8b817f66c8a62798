//! Shared HTTP plumbing for the source session and the preload worker.
//!
//! Redirects are resolved manually here: the client follows nothing on its
//! own, so response status semantics can be classified per hop and the hop
//! count bounded.

use std::time::Duration;

use reqwest::{Client, Response, Url, header};
use tracing::debug;

use crate::error::EngineError;
use crate::headers::HeaderInjector;

/// Redirect hops resolved before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Byte range of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// Everything from `offset` to the end of the resource.
    From { offset: u64 },
    /// A bounded prefix `0..=end`.
    Prefix { end: u64 },
}

impl ByteRange {
    /// Offset the request starts at.
    pub fn offset(&self) -> u64 {
        match *self {
            ByteRange::From { offset } => offset,
            ByteRange::Prefix { .. } => 0,
        }
    }

    fn header_value(&self) -> Option<String> {
        match *self {
            ByteRange::From { offset } if offset > 0 => Some(format!("bytes={offset}-")),
            ByteRange::Prefix { end } if end > 0 => Some(format!("bytes=0-{end}")),
            _ => None,
        }
    }
}

/// Create a reqwest client for engine requests.
pub fn create_client(user_agent: &str) -> Result<Client, EngineError> {
    Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(EngineError::from)
}

/// Issue a GET against `url`, resolving up to [`MAX_REDIRECTS`] redirect hops
/// and passing every outgoing request through the header injector.
///
/// A timeout is given for bounded metadata probes and left out for streaming
/// opens. Transport failures carry the URL and the range offset.
pub async fn send_request(
    client: &Client,
    url: &str,
    range: ByteRange,
    timeout: Option<Duration>,
    injector: &dyn HeaderInjector,
) -> Result<Response, EngineError> {
    let mut url = url
        .parse::<Url>()
        .map_err(|e| EngineError::UrlError(format!("{url}: {e}")))?;
    let mut redirects = 0usize;

    loop {
        debug!(url = %url, ?range, "opening connection");
        let mut request = client.get(url.clone());
        for (name, value) in injector.add_headers(url.as_str()) {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(range_header) = range.header_value() {
            request = request.header(header::RANGE, range_header);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::transport(url.as_str(), range.offset(), e))?;
        if !response.status().is_redirection() {
            return Ok(response);
        }

        redirects += 1;
        if redirects > MAX_REDIRECTS {
            return Err(EngineError::TooManyRedirects(redirects));
        }
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                EngineError::UrlError(format!("redirect from {url} without Location header"))
            })?;
        url = url
            .join(location)
            .map_err(|e| EngineError::UrlError(format!("{location}: {e}")))?;
        // the prior response is dropped here, releasing its connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_header_formatting() {
        assert_eq!(ByteRange::From { offset: 0 }.header_value(), None);
        assert_eq!(
            ByteRange::From { offset: 200 }.header_value(),
            Some("bytes=200-".to_string())
        );
        assert_eq!(ByteRange::Prefix { end: 0 }.header_value(), None);
        assert_eq!(
            ByteRange::Prefix { end: 1023 }.header_value(),
            Some("bytes=0-1023".to_string())
        );
    }

    #[test]
    fn test_range_offset() {
        assert_eq!(ByteRange::From { offset: 42 }.offset(), 42);
        assert_eq!(ByteRange::Prefix { end: 1024 }.offset(), 0);
    }
}
