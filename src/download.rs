//! Optional download of the dataset before an import.
//!
//! Network failures are fatal; there are no retries.

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Published daily export of movie ids and basic metadata.
pub const DEFAULT_DATASET_URL: &str = "https://datasets.tmdb.org/p/0.1/movie-list.json.gz";

#[derive(Debug, Clone, Copy)]
pub struct DownloadTimeouts {
    pub connect: Duration,
    /// Deadline for the whole transfer, body included.
    pub total: Duration,
}

impl Default for DownloadTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            total: Duration::from_secs(30 * 60),
        }
    }
}

/// Fetch `url` into `dest`, returning the number of bytes written.
///
/// The body is streamed into `<dest>.part`, which is renamed to `dest` only
/// after the transfer completes.
///
/// Must not be called from an async context; the binary runs it on a
/// blocking thread.
///
/// # Errors
/// Fails on connection errors, timeouts, non-success HTTP status, or any
/// local I/O error.
pub fn download_dataset(
    url: &str,
    dest: impl AsRef<Path>,
    timeouts: DownloadTimeouts,
    show_progress: bool,
) -> Result<u64> {
    let dest = dest.as_ref();
    let client = Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.total)
        .build()
        .context("build HTTP client")?;

    info!(%url, dest = %dest.display(), "downloading dataset");
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("request {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("download of {url} failed with HTTP {status}");
    }

    let pb = if show_progress {
        let pb = response
            .content_length()
            .map_or_else(ProgressBar::new_spinner, ProgressBar::new);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let part = dest.with_extension(match dest.extension() {
        Some(ext) => format!("{}.part", ext.to_string_lossy()),
        None => "part".to_string(),
    });
    let file = File::create(&part).with_context(|| format!("create {}", part.display()))?;
    let mut writer = pb.wrap_write(BufWriter::new(file));

    let written = io::copy(&mut response, &mut writer)
        .with_context(|| format!("download body of {url}"))?;
    writer
        .flush()
        .with_context(|| format!("flush {}", part.display()))?;
    drop(writer);
    pb.finish_and_clear();

    fs::rename(&part, dest)
        .with_context(|| format!("move {} to {}", part.display(), dest.display()))?;
    info!(bytes = written, dest = %dest.display(), "download complete");
    Ok(written)
}
