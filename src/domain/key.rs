use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

/// Longest key the backing store accepts.
pub const MAX_KEY_LEN: usize = 64;

/// Identifier of a cached resolution.
///
/// Derived from the SHA-256 of the canonical URL serialisation, so two inputs
/// that parse to the same [`Url`] share a key. Distinct URLs collide only if
/// SHA-256 does; nothing detects such a collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap a raw key, truncating it to [`MAX_KEY_LEN`] characters.
    pub fn new(raw: impl Into<String>) -> Self {
        let mut raw = raw.into();
        if let Some((idx, _)) = raw.char_indices().nth(MAX_KEY_LEN) {
            raw.truncate(idx);
        }
        Self(raw)
    }

    pub fn for_url(url: &Url) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        Self::new(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_deterministic() {
        let k1 = CacheKey::for_url(&url("http://bit.ly/abc"));
        let k2 = CacheKey::for_url(&url("http://bit.ly/abc"));
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let key = CacheKey::for_url(&url("http://bit.ly/abc"));
        assert_eq!(key.as_str().len(), MAX_KEY_LEN);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_uses_canonical_form() {
        let k1 = CacheKey::for_url(&url("HTTP://Bit.LY:80/abc"));
        let k2 = CacheKey::for_url(&url("http://bit.ly/abc"));
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_key_differs_per_path() {
        let k1 = CacheKey::for_url(&url("http://bit.ly/abc"));
        let k2 = CacheKey::for_url(&url("http://bit.ly/abd"));
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_new_truncates_long_keys() {
        let key = CacheKey::new("x".repeat(100));
        assert_eq!(key.as_str().len(), MAX_KEY_LEN);

        let short = CacheKey::new("-1234567");
        assert_eq!(short.as_str(), "-1234567");
    }
}
