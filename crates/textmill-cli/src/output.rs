use std::io::Write;

use owo_colors::OwoColorize;
use textmill_core::{BatchOutcome, ProgressEvent};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the run header before the batch starts.
pub fn print_run_header(
    w: &mut dyn Write,
    total: usize,
    output_dir: &std::path::Path,
    cache_enabled: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(
        w,
        "Extracting {} file{} into {}",
        total,
        if total == 1 { "" } else { "s" },
        output_dir.display()
    )?;
    if !cache_enabled {
        let note = "(cache disabled for this run)";
        if color.enabled() {
            writeln!(w, "{}", note.dimmed())?;
        } else {
            writeln!(w, "{}", note)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// One line describing a finished or failed job. `None` for events that
/// don't produce a line of their own.
pub fn format_result(event: &ProgressEvent, color: ColorMode) -> Option<String> {
    match event {
        ProgressEvent::Started { .. } => None,
        ProgressEvent::Finished {
            index,
            total,
            name,
            page_count,
            from_cache,
        } => {
            let pages = format!(
                "{} page{}",
                page_count,
                if *page_count == 1 { "" } else { "s" }
            );
            let suffix = if *from_cache { " (cached)" } else { "" };
            Some(if color.enabled() {
                format!(
                    "[{}/{}] {} {}: {}{}",
                    index + 1,
                    total,
                    "ok".green().bold(),
                    name,
                    pages,
                    suffix.dimmed()
                )
            } else {
                format!("[{}/{}] ok {}: {}{}", index + 1, total, name, pages, suffix)
            })
        }
        ProgressEvent::Failed {
            index,
            total,
            name,
            error,
        } => Some(if color.enabled() {
            format!(
                "[{}/{}] {} {}: {}",
                index + 1,
                total,
                "failed".red().bold(),
                name,
                error
            )
        } else {
            format!("[{}/{}] failed {}: {}", index + 1, total, name, error)
        }),
    }
}

/// Print a real-time progress event as a plain line.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    if let Some(line) = format_result(event, color) {
        writeln!(w, "{}", line)?;
    }
    Ok(())
}

/// Print the per-failure detail list, if any jobs failed.
pub fn print_failures(
    w: &mut dyn Write,
    outcomes: &[BatchOutcome],
    color: ColorMode,
) -> std::io::Result<()> {
    let failures: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err().map(|e| (&o.name, e)))
        .collect();
    if failures.is_empty() {
        return Ok(());
    }

    if color.enabled() {
        writeln!(w, "{}", "Failures:".red().bold())?;
    } else {
        writeln!(w, "Failures:")?;
    }
    for (name, error) in failures {
        writeln!(w, "  {}: {}", name, error)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print the final summary line.
pub fn print_summary(
    w: &mut dyn Write,
    outcomes: &[BatchOutcome],
    color: ColorMode,
) -> std::io::Result<()> {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let failed = outcomes.len() - succeeded;
    let cached = outcomes
        .iter()
        .filter(|o| o.result.as_ref().is_ok_and(|s| s.from_cache))
        .count();

    let line = format!(
        "{} succeeded ({} from cache), {} failed",
        succeeded, cached, failed
    );
    if color.enabled() {
        if failed > 0 {
            writeln!(w, "{}", line.yellow())?;
        } else {
            writeln!(w, "{}", line.green())?;
        }
    } else {
        writeln!(w, "{}", line)?;
    }
    Ok(())
}
