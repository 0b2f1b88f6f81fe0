//! Per-file extraction pipeline.
//!
//! Start → identify → resolve against the cache → extract → finalize. The
//! metadata snapshot is taken before any content read, so a cache hit never
//! opens the file. Failures never mutate the cache and are never retried
//! here.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use textmill_pdf::PdfBackend;

use crate::ExtractError;
use crate::cache::ExtractionCache;
use crate::identity::{ContentFingerprint, SourceIdentity};
use crate::record::{CacheRecord, RECORD_VERSION, SourceInfo};

/// The result of running the pipeline on one file.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub identity: SourceIdentity,
    pub record: CacheRecord,
    /// Whether the record came from the cache rather than a fresh parse.
    pub from_cache: bool,
}

pub struct ExtractionPipeline {
    cache: ExtractionCache,
    backend: Arc<dyn PdfBackend>,
}

impl ExtractionPipeline {
    pub fn new(cache: ExtractionCache, backend: Arc<dyn PdfBackend>) -> Self {
        Self { cache, backend }
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    /// Produce an extraction result for `path`, from the cache when the
    /// stored snapshot still matches, otherwise by parsing the file.
    pub fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        // Metadata first: a cache hit must not require reading content.
        let meta = std::fs::metadata(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ExtractError::SourceNotFound(path.to_path_buf())
            } else {
                ExtractError::ExtractionFailed {
                    path: path.to_path_buf(),
                    message: format!("failed to stat file: {e}"),
                }
            }
        })?;

        let abs = std::path::absolute(path).map_err(|e| ExtractError::ExtractionFailed {
            path: path.to_path_buf(),
            message: format!("failed to resolve absolute path: {e}"),
        })?;
        let identity = SourceIdentity::of_path(&abs);
        let info = SourceInfo::capture(&abs, &meta);

        if let Some(record) = self.cache.lookup(&identity, &info) {
            tracing::debug!(path = %abs.display(), identity = %identity, "reusing cached extraction");
            return Ok(Extraction {
                identity,
                record,
                from_cache: true,
            });
        }

        let bytes = std::fs::read(&abs).map_err(|e| ExtractError::ExtractionFailed {
            path: abs.clone(),
            message: format!("failed to read file: {e}"),
        })?;

        let parsed = self
            .backend
            .parse(&bytes)
            .map_err(|e| ExtractError::ExtractionFailed {
                path: abs.clone(),
                message: e.to_string(),
            })?;

        let fingerprint = ContentFingerprint::of_bytes(&bytes);
        tracing::debug!(
            path = %abs.display(),
            pages = parsed.page_count,
            chars = parsed.text.len(),
            fingerprint = %fingerprint,
            "extracted"
        );

        let record = CacheRecord {
            version: RECORD_VERSION,
            source_path: abs.to_string_lossy().into_owned(),
            size: info.size,
            modified_ns: info.modified_ns,
            text: parsed.text,
            page_count: parsed.page_count,
            title: parsed.title,
            author: parsed.author,
            creation_date: parsed.creation_date,
            fingerprint: fingerprint.as_str().to_string(),
            extracted_at: chrono::Utc::now().to_rfc3339(),
        };

        self.cache.store(&identity, &record);

        Ok(Extraction {
            identity,
            record,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;
    use textmill_pdf::{MockBackend, MockResponse};

    fn pipeline_with(backend: Arc<MockBackend>, cache_dir: &Path) -> ExtractionPipeline {
        ExtractionPipeline::new(ExtractionCache::new(cache_dir, true), backend)
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_with(Arc::new(MockBackend::echo()), dir.path());
        let err = pipeline.extract(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::SourceNotFound(_)));
    }

    #[test]
    fn second_extract_hits_cache_without_parsing() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.pdf");
        std::fs::write(&source, b"pdf bytes").unwrap();

        let backend = Arc::new(MockBackend::echo());
        let pipeline = pipeline_with(backend.clone(), &dir.path().join("cache"));

        let first = pipeline.extract(&source).unwrap();
        assert!(!first.from_cache);
        assert_eq!(backend.call_count(), 1);

        let second = pipeline.extract(&source).unwrap();
        assert!(second.from_cache);
        assert_eq!(second.record, first.record);
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn content_change_invalidates_cache() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.pdf");
        std::fs::write(&source, b"original").unwrap();

        let backend = Arc::new(MockBackend::echo());
        let pipeline = pipeline_with(backend.clone(), &dir.path().join("cache"));

        pipeline.extract(&source).unwrap();
        std::fs::write(&source, b"rewritten!").unwrap(); // different size

        let second = pipeline.extract(&source).unwrap();
        assert!(!second.from_cache);
        assert_eq!(backend.call_count(), 2);
        assert_eq!(second.record.text, "rewritten!");
    }

    #[test]
    fn touch_without_content_change_invalidates_cache() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.pdf");
        std::fs::write(&source, b"same bytes").unwrap();

        let backend = Arc::new(MockBackend::echo());
        let pipeline = pipeline_with(backend.clone(), &dir.path().join("cache"));

        let first = pipeline.extract(&source).unwrap();

        // Bump the mtime only.
        let file = std::fs::File::options().write(true).open(&source).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();
        drop(file);

        let second = pipeline.extract(&source).unwrap();
        assert!(!second.from_cache);
        assert_eq!(backend.call_count(), 2);
        // Same bytes, so the fingerprint is unchanged, but the record was
        // rewritten with the new modification time.
        assert_eq!(second.record.fingerprint, first.record.fingerprint);
        assert_ne!(second.record.modified_ns, first.record.modified_ns);

        // The rewritten record now serves hits again.
        let third = pipeline.extract(&source).unwrap();
        assert!(third.from_cache);
        assert_eq!(backend.call_count(), 2);
    }

    #[test]
    fn parse_failure_is_extraction_failed_and_caches_nothing() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.pdf");
        std::fs::write(&source, b"bytes").unwrap();

        let backend = Arc::new(MockBackend::new(MockResponse::Error("bad xref".into())));
        let pipeline = pipeline_with(backend.clone(), &dir.path().join("cache"));

        let err = pipeline.extract(&source).unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));

        let identity = SourceIdentity::of_path(&std::path::absolute(&source).unwrap());
        assert!(!pipeline.cache().record_path(&identity).exists());
    }

    #[test]
    fn disabled_cache_parses_every_time() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.pdf");
        std::fs::write(&source, b"bytes").unwrap();

        let backend = Arc::new(MockBackend::echo());
        let pipeline = ExtractionPipeline::new(ExtractionCache::disabled(), backend.clone());

        assert!(!pipeline.extract(&source).unwrap().from_cache);
        assert!(!pipeline.extract(&source).unwrap().from_cache);
        assert_eq!(backend.call_count(), 2);
    }

    #[test]
    fn record_fields_are_populated() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.pdf");
        std::fs::write(&source, b"0123456789").unwrap();

        let backend = Arc::new(MockBackend::new(MockResponse::Parsed {
            text: "ten pages of text".into(),
            page_count: 10,
            title: Some("A Title".into()),
            author: Some("An Author".into()),
        }));
        let pipeline = pipeline_with(backend, &dir.path().join("cache"));

        let extraction = pipeline.extract(&source).unwrap();
        let record = &extraction.record;
        assert_eq!(record.version, RECORD_VERSION);
        assert_eq!(record.size, 10);
        assert_eq!(record.page_count, 10);
        assert_eq!(record.title.as_deref(), Some("A Title"));
        assert_eq!(record.author.as_deref(), Some("An Author"));
        assert_eq!(record.fingerprint.len(), 12);
        assert!(record.modified_ns > 0);
        assert!(Path::new(&record.source_path).is_absolute());
    }
}
