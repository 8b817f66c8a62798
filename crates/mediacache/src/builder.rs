//! # Builder for Config
//!
//! Fluent construction of [`Config`] instances with sensible defaults for
//! every collaborator capability.
//!
//! # Example
//!
//! ```
//! use mediacache_engine::Config;
//!
//! let config = Config::builder("/tmp/media-cache")
//!     .with_user_agent("player/1.0")
//!     .build();
//!
//! let file = config.generate_cache_file("track-1", "http://cdn.example.com/track.mp3");
//! assert!(file.to_string_lossy().ends_with(".mp3"));
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, DEFAULT_USER_AGENT};
use crate::headers::{EmptyHeaderInjector, HeaderInjector};
use crate::naming::{FileNameGenerator, Md5FileNameGenerator};
use crate::source::{NoSourceInfoStorage, SourceInfoStorage};

/// Builder for [`Config`] instances.
#[derive(Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder rooted at `cache_root` with default collaborators:
    /// MD5 file names, no injected headers, no metadata persistence.
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            config: Config {
                cache_root: cache_root.into(),
                file_name_generator: Arc::new(Md5FileNameGenerator),
                header_injector: Arc::new(EmptyHeaderInjector),
                source_info_storage: Arc::new(NoSourceInfoStorage),
                user_agent: DEFAULT_USER_AGENT.to_owned(),
            },
        }
    }

    /// Set the cache file name generator.
    pub fn with_file_name_generator(mut self, generator: Arc<dyn FileNameGenerator>) -> Self {
        self.config.file_name_generator = generator;
        self
    }

    /// Set the header injector applied to every outgoing request.
    pub fn with_header_injector(mut self, injector: Arc<dyn HeaderInjector>) -> Self {
        self.config.header_injector = injector;
        self
    }

    /// Set the source metadata store.
    pub fn with_source_info_storage(mut self, storage: Arc<dyn SourceInfoStorage>) -> Self {
        self.config.source_info_storage = storage;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the [`Config`] instance.
    pub fn build(self) -> Config {
        self.config
    }
}
