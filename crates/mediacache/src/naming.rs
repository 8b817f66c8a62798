//! Cache file naming.

use md5::{Digest, Md5};

const MAX_EXTENSION_LENGTH: usize = 4;

/// Deterministic mapping from `(id, url)` to a cache file name.
pub trait FileNameGenerator: Send + Sync {
    fn generate(&self, id: &str, url: &str) -> String;
}

/// Names cache files after the MD5 of the cache id, appending the origin
/// URL's file extension when the last path segment carries a short one.
#[derive(Debug, Default, Clone, Copy)]
pub struct Md5FileNameGenerator;

impl FileNameGenerator for Md5FileNameGenerator {
    fn generate(&self, id: &str, url: &str) -> String {
        let name = hex::encode(Md5::digest(id.as_bytes()));
        match extension(url) {
            Some(ext) => format!("{name}.{ext}"),
            None => name,
        }
    }
}

/// Extension of the URL's last path segment, if it has one of at most
/// [`MAX_EXTENSION_LENGTH`] characters. A trailing query string is ignored.
fn extension(url: &str) -> Option<&str> {
    let end = url.find('?').unwrap_or(url.len());
    let path = &url[..end];
    let dot = path.rfind('.')?;
    if path.rfind('/').is_some_and(|slash| slash > dot) {
        return None;
    }
    let ext = &path[dot + 1..];
    (!ext.is_empty() && ext.len() <= MAX_EXTENSION_LENGTH).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(name: &str) -> (&str, Option<&str>) {
        match name.split_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (name, None),
        }
    }

    #[test]
    fn test_name_is_md5_hex_of_id() {
        let name = Md5FileNameGenerator.generate("item-1", "http://host/media");
        let (stem, ext) = split(&name);
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, None);
    }

    #[test]
    fn test_same_id_same_stem_regardless_of_url() {
        let a = Md5FileNameGenerator.generate("item-1", "http://host/a.mp4");
        let b = Md5FileNameGenerator.generate("item-1", "http://other/b.mp4");
        assert_eq!(split(&a).0, split(&b).0);
    }

    #[test]
    fn test_short_extension_is_kept() {
        let name = Md5FileNameGenerator.generate("id", "http://host/video.mp4");
        assert!(name.ends_with(".mp4"));
        let name = Md5FileNameGenerator.generate("id", "http://host/list.m3u8");
        assert!(name.ends_with(".m3u8"));
    }

    #[test]
    fn test_query_string_is_ignored() {
        let name = Md5FileNameGenerator.generate("id", "http://host/video.mp4?token=abc.def");
        assert!(name.ends_with(".mp4"));
    }

    #[test]
    fn test_long_pseudo_extension_is_dropped() {
        let name = Md5FileNameGenerator.generate("id", "http://host/archive.backup");
        assert_eq!(split(&name).1, None);
    }

    #[test]
    fn test_dot_before_last_slash_is_not_an_extension() {
        let name = Md5FileNameGenerator.generate("id", "http://host.com/stream");
        assert_eq!(split(&name).1, None);
    }
}
