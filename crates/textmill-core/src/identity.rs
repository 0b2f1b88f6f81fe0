//! Derived identities for source files.
//!
//! [`SourceIdentity`] keys cache storage locations: a short digest of the
//! absolute path string, computed without touching the filesystem, so a
//! cache hit never requires opening the file. [`ContentFingerprint`] digests
//! the raw bytes and is used for display and record-keeping only, never as
//! the cache key.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex characters kept from the full SHA-256 digest. 48 bits of entropy is
/// ample for corpora of tens to low thousands of files.
const DIGEST_LEN: usize = 12;

fn short_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = hex::encode(digest);
    hex.truncate(DIGEST_LEN);
    hex
}

/// Stable identity of a source file, derived from its absolute path string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceIdentity(String);

impl SourceIdentity {
    /// Compute the identity of an absolute path. Pure: two calls with the
    /// same path string yield the same identity within and across runs.
    pub fn of_path(absolute_path: &Path) -> Self {
        Self(short_digest(
            absolute_path.to_string_lossy().as_bytes(),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of a file's raw bytes, truncated for human display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(short_digest(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
