use anyhow::{Context, Result};
use cineload::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_LIMIT, DEFAULT_PROGRESS_EVERY, DEFAULT_REJECT_LOG_CAPACITY,
};
use cineload::download::{DEFAULT_DATASET_URL, DownloadTimeouts, download_dataset};
use cineload::io::glob::resolve_inputs;
use cineload::logging::{DEFAULT_FILTER, QUIET_FILTER, init_tracing};
use cineload::{
    CancelToken, FieldLimits, ImportFilters, ImportOptions, ImportSummary, ImportSupervisor,
    MemoryStore, MovieStore, SqliteStore,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

/// Where `--download` saves the dump when no `--file` is given.
const DEFAULT_DOWNLOAD_PATH: &str = "movie-list.json.gz";

#[derive(Parser, Debug)]
#[command(name = "cineload")]
#[command(about = "Bulk import of movie metadata dumps into the catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// Dataset file or glob pattern; repeat for several inputs
    #[arg(long = "file", short = 'f', env = "CINELOAD_FILE")]
    files: Vec<String>,

    /// SQLite catalog database
    #[arg(long, env = "CINELOAD_DB", default_value = "cineload.db")]
    db: PathBuf,

    /// Stop after accepting this many records
    #[arg(long, env = "CINELOAD_LIMIT", default_value_t = DEFAULT_LIMIT)]
    limit: u64,

    /// Records per commit
    #[arg(long, env = "CINELOAD_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Skip JSON entries less popular than this
    #[arg(long, env = "CINELOAD_MIN_POPULARITY", default_value_t = 0.0)]
    min_popularity: f64,

    /// Skip CSV rows with fewer votes than this
    #[arg(long, env = "CINELOAD_MIN_VOTES", default_value_t = 0)]
    min_votes: i64,

    /// Keep CSV rows whose status is not "Released"
    #[arg(long, env = "CINELOAD_INCLUDE_UNRELEASED")]
    include_unreleased: bool,

    /// Keep JSON entries flagged as adult content
    #[arg(long, env = "CINELOAD_INCLUDE_ADULT")]
    include_adult: bool,

    /// Download the dataset before importing
    #[arg(long)]
    download: bool,

    /// Dataset URL used with --download
    #[arg(long, env = "CINELOAD_DOWNLOAD_URL", default_value = DEFAULT_DATASET_URL)]
    download_url: String,

    /// Overall download deadline in seconds
    #[arg(long, env = "CINELOAD_DOWNLOAD_TIMEOUT", default_value_t = 1800)]
    download_timeout: u64,

    /// Write a sample of rejected entries to this JSON file
    #[arg(long, env = "CINELOAD_REJECT_LOG")]
    reject_log: Option<PathBuf>,

    /// Write the final summary to this JSON file
    #[arg(long, env = "CINELOAD_SUMMARY_JSON")]
    summary_json: Option<PathBuf>,

    /// Only log warnings and hide progress bars
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Validate the input without writing to the database
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn import_options(&self) -> ImportOptions {
        ImportOptions {
            limit: self.limit,
            batch_size: self.batch_size.max(1),
            filters: ImportFilters {
                include_adult: self.include_adult,
                min_popularity: self.min_popularity,
                only_released: !self.include_unreleased,
                min_votes: self.min_votes,
            },
            limits: FieldLimits::CATALOG,
            progress_every: DEFAULT_PROGRESS_EVERY,
            show_progress: !self.quiet,
            reject_log_capacity: if self.reject_log.is_some() {
                DEFAULT_REJECT_LOG_CAPACITY
            } else {
                0
            },
        }
    }
}

fn run_import<S: MovieStore>(
    store: S,
    paths: &[PathBuf],
    options: ImportOptions,
    cancel: CancelToken,
    reject_log: Option<&Path>,
) -> Result<(ImportSummary, u64)> {
    let mut supervisor = ImportSupervisor::new(store, options).with_cancel_token(cancel);
    let summary = supervisor.run(paths)?;

    if let (Some(path), Some(log)) = (reject_log, supervisor.reject_log()) {
        log.write_to_file(path)
            .with_context(|| format!("write reject log to {}", path.display()))?;
        info!(
            path = %path.display(),
            kept = log.entries().len(),
            dropped = log.overflow(),
            "reject log written"
        );
    }

    let total = supervisor.store().count()?;
    Ok((summary, total))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(if cli.quiet { QUIET_FILTER } else { DEFAULT_FILTER })?;

    let mut inputs = cli.files.clone();
    if cli.download {
        let dest = PathBuf::from(
            inputs
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_PATH.to_string()),
        );
        let url = cli.download_url.clone();
        let timeouts = DownloadTimeouts {
            total: Duration::from_secs(cli.download_timeout),
            ..Default::default()
        };
        let show = !cli.quiet;
        let target = dest.clone();
        tokio::task::spawn_blocking(move || download_dataset(&url, &target, timeouts, show))
            .await
            .context("download task failed")??;
        if inputs.is_empty() {
            inputs.push(dest.to_string_lossy().into_owned());
        }
    }
    if inputs.is_empty() {
        anyhow::bail!("no input given; pass --file <path> or --download");
    }

    let paths = resolve_inputs(&inputs)?;
    info!(files = paths.len(), db = %cli.db.display(), dry_run = cli.dry_run, "starting import");

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, committing pending records before exit");
            on_signal.cancel();
        }
    });

    let options = cli.import_options();
    let dry_run = cli.dry_run;
    let db = cli.db.clone();
    let reject_log = cli.reject_log.clone();
    let (summary, total) = tokio::task::spawn_blocking(move || {
        if dry_run {
            run_import(
                MemoryStore::new(),
                &paths,
                options,
                cancel,
                reject_log.as_deref(),
            )
        } else {
            run_import(
                SqliteStore::open(&db)?,
                &paths,
                options,
                cancel,
                reject_log.as_deref(),
            )
        }
    })
    .await
    .context("import task failed")??;

    summary.print();
    println!("Movies in catalog: {total}");
    if let Some(path) = &cli.summary_json {
        summary.save_to_file(path)?;
        info!(path = %path.display(), "summary written");
    }

    Ok(if summary.interrupted {
        ExitCode::from(130)
    } else {
        ExitCode::SUCCESS
    })
}
