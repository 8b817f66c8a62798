//! # Mediacache
//!
//! Engine for progressively consuming remote media streams while persisting
//! them to a local disk cache, so repeated or resumed access avoids
//! re-fetching already-downloaded bytes.
//!
//! ## Components
//!
//! - [`HttpSource`]: remote-source session that resolves redirects, issues
//!   range requests, classifies partial-content semantics into a full
//!   resource length and exposes a readable byte stream plus lazily-probed
//!   metadata.
//! - [`CacheRegistry`]: single-flight owner of open disk-cache handles keyed
//!   by an opaque cache id.
//! - [`PreloadOrchestrator`]: single-worker background scheduler that warms
//!   the disk cache with a byte prefix of a resource ahead of playback
//!   demand, deduplicated per id and cooperatively cancellable.
//!
//! The ranged on-disk cache file, the local proxy server and persistent
//! metadata storage are collaborators consumed through the [`CacheFile`],
//! [`ProxyUrlResolver`] and [`SourceInfoStorage`] traits.

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod headers;
pub mod naming;
pub mod preload;
pub mod proxy;
pub mod source;

pub use builder::ConfigBuilder;
pub use cache::{CacheFile, CacheFileFactory, CacheRegistry, TEMP_POSTFIX, temp_file};
pub use config::Config;
pub use error::EngineError;
pub use fetch::{ByteRange, create_client, send_request};
pub use headers::{EmptyHeaderInjector, HeaderInjector};
pub use naming::{FileNameGenerator, Md5FileNameGenerator};
pub use preload::PreloadOrchestrator;
pub use proxy::ProxyUrlResolver;
pub use source::{
    HttpSource, InMemorySourceInfoStorage, NoSourceInfoStorage, SourceInfo, SourceInfoStorage,
};
