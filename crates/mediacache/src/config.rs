use std::path::PathBuf;
use std::sync::Arc;

use crate::builder::ConfigBuilder;
use crate::headers::HeaderInjector;
use crate::naming::FileNameGenerator;
use crate::source::SourceInfoStorage;

pub(crate) const DEFAULT_USER_AGENT: &str = concat!("mediacache/", env!("CARGO_PKG_VERSION"));

/// Engine configuration: the cache location plus the injected collaborator
/// capabilities.
#[derive(Clone)]
pub struct Config {
    /// Directory holding cache files.
    pub cache_root: PathBuf,
    /// Maps `(id, url)` to a cache file name.
    pub file_name_generator: Arc<dyn FileNameGenerator>,
    /// Attaches deployment headers to every outgoing request.
    pub header_injector: Arc<dyn HeaderInjector>,
    /// Persists previously observed source metadata across sessions.
    pub source_info_storage: Arc<dyn SourceInfoStorage>,
    /// User agent for outgoing requests.
    pub user_agent: String,
}

impl Config {
    /// Start building a configuration rooted at `cache_root`.
    pub fn builder(cache_root: impl Into<PathBuf>) -> ConfigBuilder {
        ConfigBuilder::new(cache_root)
    }

    /// Resolve the on-disk cache file for `(id, url)`.
    pub fn generate_cache_file(&self, id: &str, url: &str) -> PathBuf {
        self.cache_root.join(self.file_name_generator.generate(id, url))
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cache_root", &self.cache_root)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}
