//! Test-only SHA-256 helper.
//!
//! The Stock layer is "the persistence substrate of a content-addressed
//! state database", but hashing and RLP encoding of trie nodes
//! themselves are external collaborators, out of scope here. This module
//! exists purely so tests can build realistic "value = hash of some
//! content" fixtures without inventing a fake trie. It is never used by
//! `FileStock`/`MemoryStock` internals and is not part of the crate's
//! production API.

#![cfg(test)]

use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest, usable directly as a `ValueEncoder`-friendly
/// fixed-size value via [`crate::value::FixedBytes`].
pub fn digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest(b"hello"), digest(b"hello"));
        assert_ne!(digest(b"hello"), digest(b"world"));
    }

    #[test]
    fn digest_is_32_bytes() {
        assert_eq!(digest(b"x").len(), 32);
    }
}
