use std::error::Error as StdError;
use std::path::PathBuf;

/// Errors produced by the cache engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    UrlError(String),

    #[error("too many redirects: {0}")]
    TooManyRedirects(usize),

    #[error("transport failure for {url} at offset {offset}")]
    Transport {
        url: String,
        offset: u64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("reading {url} was interrupted")]
    Interrupted { url: String },

    #[error("no active connection for {url}")]
    NoActiveConnection { url: String },

    #[error("failed to open cache file {}", path.display())]
    CacheConstruction {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Transport-level failure wrapping the underlying cause, annotated with
    /// the request URL and byte offset.
    pub fn transport(
        url: impl Into<String>,
        offset: u64,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            url: url.into(),
            offset,
            source: source.into(),
        }
    }

    /// Whether this failure was caused by cooperative cancellation rather
    /// than a genuine network fault.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}
