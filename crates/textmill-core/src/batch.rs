//! Batch runner: drives the extraction pipeline over many files in
//! fixed-size waves.
//!
//! Each wave launches up to `max_concurrent` jobs concurrently and is
//! awaited in full before the next wave starts, so the concurrency cap is a
//! structural property of the loop. Outcomes come back in input order; a
//! failing job is recorded and never aborts its siblings; the runner itself
//! never errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifacts::write_artifacts;
use crate::layout::resolve_output_dir;
use crate::pipeline::ExtractionPipeline;
use crate::{BatchOutcome, ExtractError, JobSummary, ProgressEvent};

/// File name for display, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run extraction over `paths`, writing artifacts under `output_root`.
///
/// Returns one outcome per input, in input order. Callers should pass a
/// de-duplicated list: two concurrent jobs for the same source path are not
/// serialized against each other, and the last cache store wins.
pub async fn run_batch(
    paths: Vec<PathBuf>,
    pipeline: Arc<ExtractionPipeline>,
    output_root: PathBuf,
    max_concurrent: usize,
    progress: Arc<dyn Fn(ProgressEvent) + Send + Sync>,
) -> Vec<BatchOutcome> {
    let total = paths.len();
    let max_concurrent = max_concurrent.max(1);
    let mut results: Vec<Option<BatchOutcome>> = (0..total).map(|_| None).collect();

    for (wave_index, wave) in paths.chunks(max_concurrent).enumerate() {
        tracing::debug!(wave = wave_index, jobs = wave.len(), "starting wave");

        let mut handles = Vec::with_capacity(wave.len());
        for (offset, path) in wave.iter().enumerate() {
            let index = wave_index * max_concurrent + offset;
            let name = display_name(path);
            progress(ProgressEvent::Started {
                index,
                total,
                name,
            });

            let path = path.clone();
            let pipeline = Arc::clone(&pipeline);
            let output_root = output_root.clone();
            handles.push((
                index,
                tokio::task::spawn_blocking(move || run_job(&pipeline, &path, &output_root)),
            ));
        }

        // Wave barrier: every job of this wave finishes before the next
        // wave launches.
        for (index, handle) in handles {
            let path = &paths[index];
            let name = display_name(path);
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ExtractError::ExtractionFailed {
                    path: path.clone(),
                    message: format!("extraction job panicked: {e}"),
                }),
            };

            match &result {
                Ok(summary) => progress(ProgressEvent::Finished {
                    index,
                    total,
                    name: name.clone(),
                    page_count: summary.page_count,
                    from_cache: summary.from_cache,
                }),
                Err(error) => progress(ProgressEvent::Failed {
                    index,
                    total,
                    name: name.clone(),
                    error: error.to_string(),
                }),
            }

            results[index] = Some(BatchOutcome { name, result });
        }
    }

    results.into_iter().flatten().collect()
}

/// One job: pipeline → layout → artifacts.
fn run_job(
    pipeline: &ExtractionPipeline,
    path: &Path,
    output_root: &Path,
) -> Result<JobSummary, ExtractError> {
    let extraction = pipeline.extract(path)?;
    let source_path = PathBuf::from(&extraction.record.source_path);
    let dir = resolve_output_dir(&source_path, &extraction.identity, output_root);
    write_artifacts(&dir, &extraction.identity, &extraction.record)?;

    Ok(JobSummary {
        output_dir: dir,
        page_count: extraction.record.page_count,
        char_count: extraction.record.text.chars().count(),
        fingerprint: extraction.record.fingerprint.clone(),
        from_cache: extraction.from_cache,
    })
}
