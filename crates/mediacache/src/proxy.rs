//! Local proxy surface.

/// Resolves a locally fetchable URL for `(id, url)`.
///
/// Reading the returned URL to completion makes the local proxy stream the
/// origin resource and persist it into the disk cache for that id.
pub trait ProxyUrlResolver: Send + Sync {
    fn proxy_url(&self, id: &str, url: &str) -> String;
}
