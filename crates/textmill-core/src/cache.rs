//! Persistent store for computed extraction results.
//!
//! One JSON record per source identity, at `<root>/<identity>.json`. A
//! record is served only when its stored {path, size, modification time}
//! all match the current file's snapshot; anything else (absence, decode
//! failure, metadata mismatch) is a miss. Corruption never blocks
//! progress: decode and I/O failures are downgraded to misses on lookup
//! and logged-and-swallowed on store.
//!
//! Whether caching is on is fixed at construction. Disabled, `lookup`
//! always misses and `store` is a no-op.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::identity::SourceIdentity;
use crate::record::{self, CacheRecord, SourceInfo};

/// Aggregate numbers for the `cache stats` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

pub struct ExtractionCache {
    root: PathBuf,
    enabled: bool,
}

impl ExtractionCache {
    pub fn new(root: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            root: root.into(),
            enabled,
        }
    }

    /// A cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self {
            root: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage location for a given identity.
    pub fn record_path(&self, identity: &SourceIdentity) -> PathBuf {
        self.root.join(format!("{}.json", identity))
    }

    /// Look up a reusable record for `identity`.
    ///
    /// Returns `None` on absence, decode failure, or any mismatch between
    /// the stored {path, size, mtime} and `current`. Never errors.
    pub fn lookup(&self, identity: &SourceIdentity, current: &SourceInfo) -> Option<CacheRecord> {
        if !self.enabled {
            return None;
        }

        let path = self.record_path(identity);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "cache read failed, treating as miss");
                }
                return None;
            }
        };

        let record = match record::decode(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cache record undecodable, treating as miss");
                return None;
            }
        };

        if !record.matches(current) {
            tracing::trace!(identity = %identity, "cache stale, treating as miss");
            return None;
        }

        tracing::trace!(identity = %identity, "cache hit");
        Some(record)
    }

    /// Write `record` at the location addressed by `identity`, replacing any
    /// prior record wholesale. The payload is fully serialized in memory
    /// before the destination is touched, so readers never observe a
    /// partial record. Failures are logged and swallowed: a failed cache
    /// write must not fail the extraction that produced the record.
    pub fn store(&self, identity: &SourceIdentity, record: &CacheRecord) {
        if !self.enabled {
            return;
        }

        let json = match record::encode(record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "failed to serialize cache record");
                return;
            }
        };

        if let Err(e) = std::fs::create_dir_all(&self.root) {
            tracing::warn!(root = %self.root.display(), error = %e, "failed to create cache directory");
            return;
        }

        let path = self.record_path(identity);
        if let Err(e) = std::fs::write(&path, json) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write cache record");
            return;
        }
        tracing::trace!(identity = %identity, "cache store");
    }

    /// Remove every cached record. Returns the number removed.
    pub fn clear(&self) -> std::io::Result<usize> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Entry count and total size on disk.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return stats;
        };
        for entry in entries.flatten() {
            if entry.path().extension().is_some_and(|e| e == "json")
                && let Ok(meta) = entry.metadata()
            {
                stats.entries += 1;
                stats.total_bytes += meta.len();
            }
        }
        stats
    }
}

impl std::fmt::Debug for ExtractionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionCache")
            .field("root", &self.root)
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RECORD_VERSION;
    use tempfile::TempDir;

    fn sample_record(path: &str, size: u64, modified_ns: u64) -> CacheRecord {
        CacheRecord {
            version: RECORD_VERSION,
            source_path: path.into(),
            size,
            modified_ns,
            text: "extracted text".into(),
            page_count: 3,
            title: None,
            author: None,
            creation_date: None,
            fingerprint: "abcdef012345".into(),
            extracted_at: "2026-08-06T12:00:00+00:00".into(),
        }
    }

    fn info(path: &str, size: u64, modified_ns: u64) -> SourceInfo {
        SourceInfo {
            path: PathBuf::from(path),
            size,
            modified_ns,
        }
    }

    #[test]
    fn miss_on_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        assert!(cache.lookup(&identity, &info("/data/a.pdf", 500, 1)).is_none());
    }

    #[test]
    fn hit_after_store() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        cache.store(&identity, &sample_record("/data/a.pdf", 500, 1));

        let hit = cache.lookup(&identity, &info("/data/a.pdf", 500, 1)).unwrap();
        assert_eq!(hit.text, "extracted text");
        assert_eq!(hit.page_count, 3);
    }

    #[test]
    fn miss_when_size_changed() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        cache.store(&identity, &sample_record("/data/a.pdf", 500, 1));

        assert!(cache.lookup(&identity, &info("/data/a.pdf", 501, 1)).is_none());
    }

    #[test]
    fn miss_when_mtime_changed() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        cache.store(&identity, &sample_record("/data/a.pdf", 500, 1));

        assert!(cache.lookup(&identity, &info("/data/a.pdf", 500, 2)).is_none());
    }

    #[test]
    fn miss_when_path_differs() {
        // Same identity slot, different recorded path: served only for its own path.
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        cache.store(&identity, &sample_record("/other/a.pdf", 500, 1));

        assert!(cache.lookup(&identity, &info("/data/a.pdf", 500, 1)).is_none());
    }

    #[test]
    fn corrupt_record_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        std::fs::write(cache.record_path(&identity), b"{definitely not json").unwrap();

        assert!(cache.lookup(&identity, &info("/data/a.pdf", 500, 1)).is_none());
    }

    #[test]
    fn record_missing_required_field_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        // Valid JSON, but no `text` field.
        std::fs::write(
            cache.record_path(&identity),
            br#"{"version":1,"source_path":"/data/a.pdf","size":500,"modified_ns":1}"#,
        )
        .unwrap();

        assert!(cache.lookup(&identity, &info("/data/a.pdf", 500, 1)).is_none());
    }

    #[test]
    fn store_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));

        cache.store(&identity, &sample_record("/data/a.pdf", 500, 1));
        let mut updated = sample_record("/data/a.pdf", 500, 2);
        updated.text = "new text".into();
        cache.store(&identity, &updated);

        assert!(cache.lookup(&identity, &info("/data/a.pdf", 500, 1)).is_none());
        let hit = cache.lookup(&identity, &info("/data/a.pdf", 500, 2)).unwrap();
        assert_eq!(hit.text, "new text");
    }

    #[test]
    fn disabled_cache_never_hits_never_writes() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), false);
        let identity = SourceIdentity::of_path(Path::new("/data/a.pdf"));

        cache.store(&identity, &sample_record("/data/a.pdf", 500, 1));
        assert!(cache.lookup(&identity, &info("/data/a.pdf", 500, 1)).is_none());
        assert!(!cache.record_path(&identity).exists());
    }

    #[test]
    fn distinct_identities_use_distinct_locations() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let id_a = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        let id_b = SourceIdentity::of_path(Path::new("/data/b.pdf"));

        cache.store(&id_a, &sample_record("/data/a.pdf", 500, 1));
        cache.store(&id_b, &sample_record("/data/b.pdf", 600, 2));

        assert!(cache.lookup(&id_a, &info("/data/a.pdf", 500, 1)).is_some());
        assert!(cache.lookup(&id_b, &info("/data/b.pdf", 600, 2)).is_some());
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn clear_removes_all_records() {
        let dir = TempDir::new().unwrap();
        let cache = ExtractionCache::new(dir.path(), true);
        let id_a = SourceIdentity::of_path(Path::new("/data/a.pdf"));
        let id_b = SourceIdentity::of_path(Path::new("/data/b.pdf"));
        cache.store(&id_a, &sample_record("/data/a.pdf", 500, 1));
        cache.store(&id_b, &sample_record("/data/b.pdf", 600, 2));

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.stats().entries, 0);
        assert!(cache.lookup(&id_a, &info("/data/a.pdf", 500, 1)).is_none());
    }

    #[test]
    fn clear_on_missing_root_is_zero() {
        let cache = ExtractionCache::new("/nonexistent/textmill-test-cache", true);
        assert_eq!(cache.clear().unwrap(), 0);
    }
}
