//! Disk-cache collaborator contract and the single-flight handle registry.

pub mod file;
pub mod registry;

pub use file::{CacheFile, CacheFileFactory, TEMP_POSTFIX, temp_file};
pub use registry::CacheRegistry;
