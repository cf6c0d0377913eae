//! Key derivation
//!
//! Cache and lock keys live in separate namespaces so the two never collide.
//! File-backed stores map keys to fixed-length names with SHA256, the same
//! way any key (including prefixes with `:`) lands on a portable file name.

use crate::color::ColorCode;
use sha2::{Digest, Sha256};

/// Default namespace for colour → CID cache entries
pub const DEFAULT_CACHE_PREFIX: &str = "swatch:img:";

/// Default namespace for per-colour mint locks
pub const DEFAULT_LOCK_PREFIX: &str = "swatch:img.lock:";

/// Cache key for a colour's CID
pub fn cache_key(prefix: &str, color: &ColorCode) -> String {
    format!("{}{}", prefix, color)
}

/// Lock key guarding a colour's mint
pub fn lock_key(prefix: &str, color: &ColorCode) -> String {
    format!("{}{}", prefix, color)
}

/// File name stem for a key: SHA256 of the key bytes, hex encoded
pub fn file_stem(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_canonical_colour() {
        let color = ColorCode::parse("1a2b3c").unwrap();
        assert_eq!(cache_key(DEFAULT_CACHE_PREFIX, &color), "swatch:img:1A2B3C");
        assert_eq!(lock_key(DEFAULT_LOCK_PREFIX, &color), "swatch:img.lock:1A2B3C");
    }

    #[test]
    fn namespaces_do_not_collide() {
        let color = ColorCode::parse("000000").unwrap();
        assert_ne!(
            cache_key(DEFAULT_CACHE_PREFIX, &color),
            lock_key(DEFAULT_LOCK_PREFIX, &color)
        );
    }

    #[test]
    fn file_stem_is_stable_hex() {
        let stem = file_stem("swatch:img:1A2B3C");
        assert_eq!(stem.len(), 64);
        assert!(stem.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(stem, file_stem("swatch:img:1A2B3C"));
        assert_ne!(stem, file_stem("swatch:img:1A2B3D"));
    }
}
