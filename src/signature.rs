//! Content fingerprints.
//!
//! A [`Signature`] is the hex-encoded SHA-256 of the exact bytes of an
//! artifact. It is only used as an equality oracle to skip redundant remote
//! writes.

use sha2::{Digest, Sha256};
use std::fmt;

/// Fixed-length (64 hex chars) content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// Wrap a previously persisted signature string.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the signature of `content`.
pub fn signature(content: impl AsRef<[u8]>) -> Signature {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    Signature(hex::encode(hasher.finalize()))
}
