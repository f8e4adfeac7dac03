//! Storage key generation for uploaded media.
//!
//! Key format: `{YYYYMMDD}-{32 hex chars}` followed by `.{ext}` when the original
//! filename has a usable extension. The date prefix only helps sorting; uniqueness
//! comes from 16 bytes of CSPRNG output. The extension keeps its original case
//! and is taken from the final path segment only, so a key never contains a
//! separator or a `..` sequence.

use chrono::{NaiveDate, Utc};
use quill_core::constants::MEDIA_PATH_PREFIX;
use std::fmt;

const RANDOM_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Generate a key for `original_filename` dated today (UTC).
    pub fn generate(original_filename: &str) -> Self {
        Self::generate_on(original_filename, Utc::now().date_naive())
    }

    pub fn generate_on(original_filename: &str, date: NaiveDate) -> Self {
        let random: [u8; RANDOM_BYTES] = rand::random();
        let mut key = format!("{}-{}", date.format("%Y%m%d"), hex::encode(random));
        if let Some(ext) = extension_of(original_filename) {
            key.push('.');
            key.push_str(ext);
        }
        StorageKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }

    /// Path relative to both the stores and the media base URL: `file/{key}`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", MEDIA_PATH_PREFIX, self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extension of the final path segment, if it is non-empty ASCII alphanumeric.
pub fn extension_of(filename: &str) -> Option<&str> {
    let basename = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
    let (_, ext) = basename.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_key_format() {
        let key = StorageKey::generate_on("photo.jpg", date());
        let (prefix, rest) = key.as_str().split_once('-').unwrap();
        assert_eq!(prefix, "20240309");
        let (random, ext) = rest.split_once('.').unwrap();
        assert_eq!(random.len(), RANDOM_BYTES * 2);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, "jpg");
    }

    #[test]
    fn test_extension_case_preserved() {
        let key = StorageKey::generate("photo.JPG");
        assert_eq!(key.extension(), Some("JPG"));
    }

    #[test]
    fn test_only_last_extension_used() {
        let key = StorageKey::generate("archive.tar.gz");
        assert_eq!(key.extension(), Some("gz"));
        assert!(!key.as_str().contains("tar"));
    }

    #[test]
    fn test_no_extension() {
        let key = StorageKey::generate("README");
        assert_eq!(key.extension(), None);
        assert!(!key.as_str().contains('.'));

        let key = StorageKey::generate("");
        assert!(!key.as_str().contains('.'));
    }

    #[test]
    fn test_trailing_dot_has_no_extension() {
        assert_eq!(extension_of("photo."), None);
    }

    #[test]
    fn test_traversal_never_reaches_key() {
        for name in ["a.b/../../etc/passwd", "x.y\\..\\evil", "../../photo.png", "pic.j/pg"] {
            let key = StorageKey::generate(name);
            assert!(!key.as_str().contains(".."), "{}", key);
            assert!(!key.as_str().contains('/'), "{}", key);
            assert!(!key.as_str().contains('\\'), "{}", key);
        }
        assert_eq!(extension_of("../../photo.png"), Some("png"));
    }

    #[test]
    fn test_keys_are_unique() {
        let a = StorageKey::generate("same.png");
        let b = StorageKey::generate("same.png");
        assert_ne!(a, b);
    }

    #[test]
    fn test_relative_path() {
        let key = StorageKey::generate_on("a.png", date());
        assert_eq!(key.relative_path(), format!("file/{}", key));
    }
}
