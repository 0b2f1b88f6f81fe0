//! Persisted output artifacts: one directory per processed source holding
//! the machine-readable record, the plain extracted text, and a
//! human-readable summary.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::ExtractError;
use crate::identity::SourceIdentity;
use crate::record::CacheRecord;

pub const RECORD_FILE: &str = "record.json";
pub const TEXT_FILE: &str = "extracted.txt";
pub const SUMMARY_FILE: &str = "summary.txt";

/// The full record as written to the output directory: the cache-record
/// shape plus the resolved output location.
#[derive(Debug, Serialize)]
struct OutputRecord<'a> {
    #[serde(flatten)]
    record: &'a CacheRecord,
    identity: &'a str,
    output_dir: String,
}

/// Materialize the output directory and write all three artifacts.
///
/// The plain-text artifact is exactly the record's extracted text, so
/// re-running an unchanged source (a cache hit) reproduces it
/// byte-for-byte.
pub fn write_artifacts(
    dir: &Path,
    identity: &SourceIdentity,
    record: &CacheRecord,
) -> Result<(), ExtractError> {
    let write_failed = |source: std::io::Error| ExtractError::OutputWrite {
        path: dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_failed)?;

    let output = OutputRecord {
        record,
        identity: identity.as_str(),
        output_dir: dir.display().to_string(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| write_failed(std::io::Error::other(e)))?;

    std::fs::write(dir.join(RECORD_FILE), json).map_err(write_failed)?;
    std::fs::write(dir.join(TEXT_FILE), record.text.as_bytes()).map_err(write_failed)?;
    std::fs::write(dir.join(SUMMARY_FILE), render_summary(identity, record))
        .map_err(write_failed)?;

    tracing::debug!(dir = %dir.display(), "wrote output artifacts");
    Ok(())
}

fn render_summary(identity: &SourceIdentity, record: &CacheRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "source:      {}", record.source_path);
    let _ = writeln!(out, "identity:    {}", identity);
    let _ = writeln!(out, "pages:       {}", record.page_count);
    let _ = writeln!(out, "characters:  {}", record.text.chars().count());
    let _ = writeln!(out, "fingerprint: {}", record.fingerprint);
    let _ = writeln!(out, "extracted:   {}", record.extracted_at);
    if let Some(ref title) = record.title {
        let _ = writeln!(out, "title:       {}", title);
    }
    if let Some(ref author) = record.author {
        let _ = writeln!(out, "author:      {}", author);
    }
    if let Some(ref created) = record.creation_date {
        let _ = writeln!(out, "created:     {}", created);
    }
    out
}
