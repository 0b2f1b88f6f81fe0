//! Output directory resolution.
//!
//! The candidate name is the source's base name under the output root. A
//! directory is reused only when its own persisted record proves it belongs
//! to the same source path. A directory we cannot prove ownership of
//! (different recorded source, missing record, undecodable record) forces
//! the disambiguated `<base>-<identity>` name. Resolution never writes.

use std::path::{Path, PathBuf};

use crate::artifacts::RECORD_FILE;
use crate::identity::SourceIdentity;
use crate::record;

/// Resolve the output directory for a source file.
///
/// Deterministic for a given (source path, output root, on-disk state):
/// re-running an unchanged source resolves to the same directory, and two
/// different sources sharing a base name resolve to different directories.
pub fn resolve_output_dir(
    source_path: &Path,
    identity: &SourceIdentity,
    output_root: &Path,
) -> PathBuf {
    let base = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| identity.as_str().to_string());

    let candidate = output_root.join(&base);
    if !candidate.exists() {
        return candidate;
    }

    if let Some(owner) = dir_owner(&candidate)
        && owner == source_path
    {
        tracing::debug!(dir = %candidate.display(), "reusing output directory");
        return candidate;
    }

    let fallback = output_root.join(format!("{}-{}", base, identity));
    tracing::debug!(
        dir = %candidate.display(),
        fallback = %fallback.display(),
        "output directory belongs to a different source, disambiguating"
    );
    fallback
}

/// The source path recorded in a directory's persisted record, if present
/// and decodable. Any read or decode failure yields `None`; the caller
/// treats the directory as foreign.
fn dir_owner(dir: &Path) -> Option<PathBuf> {
    let bytes = std::fs::read(dir.join(RECORD_FILE)).ok()?;
    let record = record::decode(&bytes).ok()?;
    Some(PathBuf::from(record.source_path))
}
