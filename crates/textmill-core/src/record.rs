//! The persisted record schema, shared by the cache store and the output
//! artifacts.
//!
//! One explicit, version-tagged shape: unknown fields are tolerated on
//! decode (forward-readable), missing required fields are a
//! [`DecodeError`]. The cache store folds every decode failure into a miss;
//! the error type stays distinct so tests and logging can tell corruption
//! from absence.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bumped when fields are added. Older records remain decodable because new
/// fields are optional.
pub const RECORD_VERSION: u32 = 1;

/// Metadata snapshot of a source file, taken before any content read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Absolute path of the source file.
    pub path: PathBuf,
    pub size: u64,
    /// Modification time, nanoseconds since the Unix epoch.
    pub modified_ns: u64,
}

impl SourceInfo {
    /// Snapshot from already-fetched filesystem metadata. `path` must be
    /// absolute.
    pub fn capture(path: &Path, meta: &Metadata) -> Self {
        let modified_ns = meta
            .modified()
            .map(system_time_ns)
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            size: meta.len(),
            modified_ns,
        }
    }
}

fn system_time_ns(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// A fully computed extraction result, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub version: u32,
    /// Absolute path of the source file at extraction time.
    pub source_path: String,
    pub size: u64,
    pub modified_ns: u64,
    pub text: String,
    pub page_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    /// Digest of the source bytes at extraction time.
    pub fingerprint: String,
    /// RFC 3339 timestamp of when extraction ran.
    pub extracted_at: String,
}

impl CacheRecord {
    /// Whether this record is valid for reuse against the current snapshot:
    /// stored path, size, and modification time must all match exactly.
    pub fn matches(&self, current: &SourceInfo) -> bool {
        Path::new(&self.source_path) == current.path
            && self.size == current.size
            && self.modified_ns == current.modified_ns
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("record is not decodable: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode a persisted record. Missing required fields or malformed JSON are
/// a [`DecodeError`]; unknown fields are ignored.
pub fn decode(bytes: &[u8]) -> Result<CacheRecord, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Serialize a record to its on-disk form.
pub fn encode(record: &CacheRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}
