use std::collections::HashSet;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use glob::glob;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use textmill_core::{
    BatchOutcome, Config, ExtractionCache, ExtractionPipeline, ProgressEvent, config_file,
    run_batch,
};
use textmill_pdf::LopdfBackend;

mod output;

use output::ColorMode;

/// textmill - Extract text and metadata from PDF files, with caching
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from one or more PDF files
    Extract {
        /// Files, directories, or glob patterns to process
        inputs: Vec<String>,

        /// Directory to write per-file output under
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Maximum number of concurrently running extraction jobs
        #[arg(short = 'j', long)]
        max_concurrent: Option<usize>,

        /// Bypass the extraction cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Directory holding cached extraction records
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output report file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect or clear the extraction cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Print cache location, record count, and size on disk
    Stats {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Delete all cached extraction records
    Clear {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Extract {
            inputs,
            output_dir,
            max_concurrent,
            no_cache,
            cache_dir,
            no_color,
            output,
        } => {
            extract(
                inputs,
                output_dir,
                max_concurrent,
                no_cache,
                cache_dir,
                no_color,
                output,
            )
            .await
        }
        Command::Cache { command } => match command {
            CacheCommand::Stats { cache_dir } => cache_stats(cache_dir),
            CacheCommand::Clear { cache_dir } => cache_clear(cache_dir),
        },
    }
}

/// Resolve run configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(
    output_dir: Option<PathBuf>,
    max_concurrent: Option<usize>,
    no_cache: bool,
    cache_dir: Option<PathBuf>,
) -> Config {
    let file = config_file::load_config();
    let defaults = Config::default();

    let cache_dir = cache_dir
        .or_else(|| std::env::var("TEXTMILL_CACHE_DIR").ok().map(PathBuf::from))
        .or_else(|| {
            file.cache
                .as_ref()
                .and_then(|c| c.dir.clone())
                .map(PathBuf::from)
        })
        .unwrap_or(defaults.cache_dir);

    let cache_enabled = if no_cache {
        false
    } else {
        file.cache
            .as_ref()
            .and_then(|c| c.enabled)
            .unwrap_or(defaults.cache_enabled)
    };

    let output_dir = output_dir
        .or_else(|| std::env::var("TEXTMILL_OUTPUT_DIR").ok().map(PathBuf::from))
        .or_else(|| {
            file.output
                .as_ref()
                .and_then(|o| o.dir.clone())
                .map(PathBuf::from)
        })
        .unwrap_or(defaults.output_dir);

    let max_concurrent = max_concurrent
        .or_else(|| {
            std::env::var("TEXTMILL_MAX_CONCURRENT")
                .ok()
                .and_then(|v| v.parse().ok())
        })
        .or_else(|| file.concurrency.as_ref().and_then(|c| c.max_concurrent))
        .unwrap_or(defaults.max_concurrent)
        .max(1);

    Config {
        cache_enabled,
        cache_dir,
        output_dir,
        max_concurrent,
    }
}

/// Expand globs and directories into a flat, de-duplicated file list.
///
/// Named files that don't exist are kept: the batch reports them as
/// per-file failures instead of aborting the whole run.
fn gather_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let looks_like_glob =
            input.contains('*') || input.contains('?') || input.contains('[');
        if looks_like_glob {
            for entry in glob(input)? {
                let path = entry?;
                if path.is_file() {
                    files.push(path);
                }
            }
            continue;
        }

        let path = PathBuf::from(input);
        if path.is_dir() {
            for entry in WalkDir::new(&path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
                {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(path);
        }
    }

    // De-duplicate by absolute path, preserving first-seen order: the
    // runner does not serialize duplicate inputs against each other.
    let mut seen = HashSet::new();
    files.retain(|p| {
        let key = std::path::absolute(p).unwrap_or_else(|_| p.clone());
        seen.insert(key)
    });
    Ok(files)
}

async fn extract(
    inputs: Vec<String>,
    output_dir: Option<PathBuf>,
    max_concurrent: Option<usize>,
    no_cache: bool,
    cache_dir: Option<PathBuf>,
    no_color: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("no inputs given (expected files, directories, or glob patterns)");
    }

    let config = resolve_config(output_dir, max_concurrent, no_cache, cache_dir);
    let paths = gather_inputs(&inputs)?;
    if paths.is_empty() {
        println!("No files matched the given inputs.");
        return Ok(());
    }
    let total = paths.len();

    let use_color = !no_color && output.is_none();
    let color = ColorMode(use_color);

    let mut writer: Box<dyn Write> = if let Some(ref output_path) = output {
        Box::new(std::fs::File::create(output_path)?)
    } else {
        Box::new(std::io::stdout())
    };

    output::print_run_header(&mut writer, total, &config.output_dir, config.cache_enabled, color)?;

    let cache = ExtractionCache::new(&config.cache_dir, config.cache_enabled);
    let pipeline = Arc::new(ExtractionPipeline::new(cache, Arc::new(LopdfBackend)));

    // Progress goes to stderr when the report is redirected to a file.
    let progress_writer: Arc<Mutex<Box<dyn Write + Send>>> = if output.is_some() {
        Arc::new(Mutex::new(Box::new(std::io::stderr())))
    } else {
        Arc::new(Mutex::new(Box::new(std::io::stdout())))
    };

    let bar = if std::io::stderr().is_terminal() && output.is_none() && total > 1 {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=> "),
        );
        Some(bar)
    } else {
        None
    };

    let progress_cb: Arc<dyn Fn(ProgressEvent) + Send + Sync> = {
        let bar = bar.clone();
        let pw = Arc::clone(&progress_writer);
        Arc::new(move |event: ProgressEvent| {
            if let Some(ref bar) = bar {
                match &event {
                    ProgressEvent::Started { name, .. } => bar.set_message(name.clone()),
                    ProgressEvent::Finished { .. } | ProgressEvent::Failed { .. } => {
                        if let Some(line) = output::format_result(&event, color) {
                            bar.println(line);
                        }
                        bar.inc(1);
                    }
                }
            } else if let Ok(mut w) = pw.lock() {
                let _ = output::print_progress(&mut *w, &event, color);
                let _ = w.flush();
            }
        })
    };

    let outcomes = run_batch(
        paths,
        pipeline,
        config.output_dir.clone(),
        config.max_concurrent,
        progress_cb,
    )
    .await;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    writeln!(writer)?;
    output::print_failures(&mut writer, &outcomes, color)?;
    output::print_summary(&mut writer, &outcomes, color)?;
    writer.flush()?;

    if outcomes.iter().any(|o: &BatchOutcome| !o.is_success()) {
        std::process::exit(1);
    }
    Ok(())
}

fn cache_stats(cache_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = resolve_config(None, None, false, cache_dir);
    let cache = ExtractionCache::new(&config.cache_dir, true);
    let stats = cache.stats();
    println!("cache directory: {}", config.cache_dir.display());
    println!("records:         {}", stats.entries);
    println!("size:            {}", HumanBytes(stats.total_bytes));
    Ok(())
}

fn cache_clear(cache_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = resolve_config(None, None, false, cache_dir);
    let cache = ExtractionCache::new(&config.cache_dir, true);
    let removed = cache.clear()?;
    println!(
        "Removed {} cached record{} from {}",
        removed,
        if removed == 1 { "" } else { "s" },
        config.cache_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_inputs_dedupes_repeated_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.pdf");
        std::fs::write(&a, "x").unwrap();
        let input = a.to_string_lossy().to_string();

        let files = gather_inputs(&[input.clone(), input]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn gather_inputs_keeps_missing_files_for_per_file_reporting() {
        let files = gather_inputs(&["/no/such/file.pdf".to_string()]).unwrap();
        assert_eq!(files, vec![PathBuf::from("/no/such/file.pdf")]);
    }

    #[test]
    fn gather_inputs_walks_directories_for_pdfs() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.pdf"), "x").unwrap();
        std::fs::write(dir.path().join("b.PDF"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = gather_inputs(&[dir.path().to_string_lossy().to_string()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| {
            f.extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        }));
    }

    #[test]
    fn gather_inputs_expands_globs() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.pdf"), "x").unwrap();
        std::fs::write(dir.path().join("two.pdf"), "x").unwrap();

        let pattern = dir.path().join("*.pdf").to_string_lossy().to_string();
        let files = gather_inputs(&[pattern]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn flag_overrides_take_precedence() {
        let config = resolve_config(
            Some(PathBuf::from("/flag/out")),
            Some(9),
            true,
            Some(PathBuf::from("/flag/cache")),
        );
        assert_eq!(config.output_dir, PathBuf::from("/flag/out"));
        assert_eq!(config.max_concurrent, 9);
        assert_eq!(config.cache_dir, PathBuf::from("/flag/cache"));
        assert!(!config.cache_enabled);
    }
}
