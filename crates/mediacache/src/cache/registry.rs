//! Single-flight registry of open cache-file handles.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::file::{CacheFile, CacheFileFactory};
use crate::config::Config;
use crate::error::EngineError;

/// Owner of at most one live cache-file handle per cache id.
///
/// Creation is memoized under a single lock, so concurrent callers for the
/// same id observe the same handle instance. Constructing a handle for an id
/// outside this registry breaks the single-writer guarantee on the backing
/// file.
pub struct CacheRegistry {
    factory: Arc<dyn CacheFileFactory>,
    handles: Mutex<HashMap<String, Arc<dyn CacheFile>>>,
}

impl CacheRegistry {
    pub fn new(factory: Arc<dyn CacheFileFactory>) -> Self {
        Self {
            factory,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Return the handle registered for `id`, constructing and registering
    /// one from `config` when absent.
    ///
    /// A construction failure propagates and leaves the registry without a
    /// partial entry.
    pub fn get_or_create(
        &self,
        id: &str,
        url: &str,
        config: &Config,
    ) -> Result<Arc<dyn CacheFile>, EngineError> {
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(id) {
            return Ok(handle.clone());
        }

        let path = config.generate_cache_file(id, url);
        debug!(id, file = %path.display(), "opening cache file");
        let handle = self
            .factory
            .open(&path)
            .map_err(|source| EngineError::CacheConstruction {
                path: path.clone(),
                source,
            })?;
        handles.insert(id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Remove and close the handle for `id`, if registered.
    pub fn remove(&self, id: &str) {
        let removed = self.handles.lock().remove(id);
        if let Some(handle) = removed {
            close_handle(id, &handle);
        }
    }

    /// Remove and close every handle whose backing file is `path`.
    pub fn remove_by_path(&self, path: &Path) {
        let mut handles = self.handles.lock();
        let ids: Vec<String> = handles
            .iter()
            .filter(|(_, handle)| handle.file().as_path() == path)
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            if let Some(handle) = handles.remove(&id) {
                close_handle(&id, &handle);
            }
        }
    }

    /// Remove and close the registration of exactly this handle instance.
    pub fn remove_by_handle(&self, handle: &Arc<dyn CacheFile>) {
        let mut handles = self.handles.lock();
        let ids: Vec<String> = handles
            .iter()
            .filter(|(_, registered)| Arc::ptr_eq(registered, handle))
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            if let Some(handle) = handles.remove(&id) {
                close_handle(&id, &handle);
            }
        }
    }

    /// Whether a handle is currently registered for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.handles.lock().contains_key(id)
    }
}

/// Close failures are logged, never propagated: removal must always succeed
/// from the registry's point of view.
fn close_handle(id: &str, handle: &Arc<dyn CacheFile>) {
    debug!(id, "removing cache handle");
    if let Err(err) = handle.close() {
        warn!(id, error = %err, "error closing cache file");
    }
}
