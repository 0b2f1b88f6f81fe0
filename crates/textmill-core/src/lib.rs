use std::path::PathBuf;

use thiserror::Error;

pub mod artifacts;
pub mod batch;
pub mod cache;
pub mod config_file;
pub mod identity;
pub mod layout;
pub mod pipeline;
pub mod record;

// Re-export for convenience
pub use batch::{display_name, run_batch};
pub use cache::{CacheStats, ExtractionCache};
pub use identity::{ContentFingerprint, SourceIdentity};
pub use layout::resolve_output_dir;
pub use pipeline::{Extraction, ExtractionPipeline};
pub use record::{CacheRecord, DecodeError, RECORD_VERSION, SourceInfo};

/// Per-file failures. Every variant is fatal for its file only; the batch
/// runner converts them into outcome entries and keeps going.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("source file not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("extraction failed for {path}: {message}")]
    ExtractionFailed { path: PathBuf, message: String },
    #[error("failed to write artifacts to {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Summary of one successfully processed file.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub output_dir: PathBuf,
    pub page_count: usize,
    pub char_count: usize,
    pub fingerprint: String,
    pub from_cache: bool,
}

/// One entry per processed file, in input order.
#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: Result<JobSummary, ExtractError>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Progress events emitted during a batch run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        index: usize,
        total: usize,
        name: String,
    },
    Finished {
        index: usize,
        total: usize,
        name: String,
        page_count: usize,
        from_cache: bool,
    },
    Failed {
        index: usize,
        total: usize,
        name: String,
        error: String,
    },
}

/// Configuration for an extraction run, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_enabled: bool,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_concurrent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_dir: default_cache_dir(),
            output_dir: PathBuf::from("extracted"),
            max_concurrent: 4,
        }
    }
}

/// Platform cache directory: `<cache_dir>/textmill`, with a CWD fallback
/// for platforms without one.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("textmill"))
        .unwrap_or_else(|| PathBuf::from(".textmill-cache"))
}
