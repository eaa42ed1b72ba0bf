//! Import counters, throughput, and the end-of-run summary.
//!
//! # Overview
//!
//! - [`ImportStats`] holds one counter per outcome while a run is in progress
//! - [`ImportSummary`] is the frozen, serializable result of a run
//! - [`ProgressReporter`] draws an optional progress bar from the stats
//!
//! Every examined entry ends up in exactly one outcome counter, so after the
//! final flush:
//!
//! ```text
//! examined = imported + skipped_existing + skipped_invalid + skipped_parse
//!          + skipped_filtered.total() + commit_failed
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cineload::metrics::ImportStats;
//! use cineload::supervisor::ImportState;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut stats = ImportStats::new();
//! stats.record_examined();
//! stats.record_imported(1);
//!
//! let summary = stats.summary(ImportState::Exhausted);
//! summary.print();
//! summary.save_to_file("summary.json")?;
//! # Ok(())
//! # }
//! ```

use crate::commit::BatchOutcome;
use crate::supervisor::ImportState;
use crate::validation::{FilterReason, SkipReason};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Filtered entries, by filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredCounts {
    pub adult: u64,
    pub unpopular: u64,
    pub unreleased: u64,
    pub low_votes: u64,
}

impl FilteredCounts {
    pub fn record(&mut self, reason: FilterReason) {
        match reason {
            FilterReason::Adult => self.adult += 1,
            FilterReason::Unpopular => self.unpopular += 1,
            FilterReason::Unreleased => self.unreleased += 1,
            FilterReason::LowVotes => self.low_votes += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.adult + self.unpopular + self.unreleased + self.low_votes
    }
}

/// Running counters for one import.
#[derive(Debug, Clone)]
pub struct ImportStats {
    pub examined: u64,
    pub imported: u64,
    pub skipped_existing: u64,
    pub skipped_invalid: u64,
    pub skipped_parse: u64,
    pub skipped_filtered: FilteredCounts,
    pub commit_failed: u64,
    start: Instant,
}

impl Default for ImportStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            examined: 0,
            imported: 0,
            skipped_existing: 0,
            skipped_invalid: 0,
            skipped_parse: 0,
            skipped_filtered: FilteredCounts::default(),
            commit_failed: 0,
            start: Instant::now(),
        }
    }

    pub fn record_examined(&mut self) {
        self.examined += 1;
    }

    pub fn record_imported(&mut self, n: u64) {
        self.imported += n;
    }

    pub fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::ParseError { .. } => self.skipped_parse += 1,
            SkipReason::Invalid { .. } => self.skipped_invalid += 1,
            SkipReason::Filtered { filter } => self.skipped_filtered.record(*filter),
            SkipReason::Existing => self.skipped_existing += 1,
        }
    }

    /// Fold a flushed batch into the counters.
    ///
    /// Rows the store ignored as already present count as existing.
    pub fn record_batch(&mut self, outcome: &BatchOutcome) {
        self.imported += outcome.committed as u64;
        self.skipped_existing += outcome.ignored as u64;
        self.commit_failed += outcome.failed as u64;
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Imported records per second since the run started.
    pub fn rate(&self) -> f64 {
        rate(self.imported, self.elapsed())
    }

    /// Estimated time until `limit` records are imported at the current rate.
    pub fn eta(&self, limit: u64) -> Option<Duration> {
        eta(self.imported, limit, self.elapsed())
    }

    /// Freeze the counters into a summary.
    pub fn summary(&self, state: ImportState) -> ImportSummary {
        let elapsed = self.elapsed();
        ImportSummary {
            imported: self.imported,
            skipped_existing: self.skipped_existing,
            skipped_invalid: self.skipped_invalid,
            skipped_parse: self.skipped_parse,
            skipped_filtered: self.skipped_filtered,
            commit_failed: self.commit_failed,
            examined: self.examined,
            elapsed_secs: elapsed.as_secs_f64(),
            records_per_sec: rate(self.imported, elapsed),
            interrupted: state == ImportState::Interrupted,
            state,
        }
    }
}

/// `imported / elapsed`, or 0 before any time has passed.
pub fn rate(imported: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        imported as f64 / secs
    } else {
        0.0
    }
}

/// `(limit - imported) / rate`; `None` while the rate is zero or the limit is met.
pub fn eta(imported: u64, limit: u64, elapsed: Duration) -> Option<Duration> {
    let r = rate(imported, elapsed);
    if r <= 0.0 || imported >= limit {
        return None;
    }
    Some(Duration::from_secs_f64((limit - imported) as f64 / r))
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: u64,
    pub skipped_existing: u64,
    pub skipped_invalid: u64,
    pub skipped_parse: u64,
    pub skipped_filtered: FilteredCounts,
    pub commit_failed: u64,
    pub examined: u64,
    pub elapsed_secs: f64,
    pub records_per_sec: f64,
    pub interrupted: bool,
    /// Terminal condition reached before finalizing.
    pub state: ImportState,
}

impl ImportSummary {
    /// Whether every examined entry is accounted for.
    pub fn is_consistent(&self) -> bool {
        self.examined
            == self.imported
                + self.skipped_existing
                + self.skipped_invalid
                + self.skipped_parse
                + self.skipped_filtered.total()
                + self.commit_failed
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize import summary")
    }

    /// Print a human-readable table to stdout.
    pub fn print(&self) {
        println!("\n============ Import Summary ============");
        println!("Imported:            {}", self.imported);
        println!("Skipped (existing):  {}", self.skipped_existing);
        println!("Skipped (invalid):   {}", self.skipped_invalid);
        println!("Skipped (parse):     {}", self.skipped_parse);
        println!("Skipped (filtered):  {}", self.skipped_filtered.total());
        println!("  adult:             {}", self.skipped_filtered.adult);
        println!("  unpopular:         {}", self.skipped_filtered.unpopular);
        println!("  unreleased:        {}", self.skipped_filtered.unreleased);
        println!("  low votes:         {}", self.skipped_filtered.low_votes);
        println!("Commit failures:     {}", self.commit_failed);
        println!("Examined:            {}", self.examined);
        println!("----------------------------------------");
        println!(
            "Elapsed: {:.1}s ({:.1} records/s){}",
            self.elapsed_secs,
            self.records_per_sec,
            if self.interrupted { " [interrupted]" } else { "" }
        );
        println!("========================================\n");
    }

    /// Write the summary to `path` as pretty JSON.
    ///
    /// # Errors
    /// Fails if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("write summary to {}", path.display()))
    }
}

/// Progress bar toward the record limit; a no-op when hidden.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    limit: u64,
}

impl ProgressReporter {
    pub fn new(limit: u64, visible: bool) -> Self {
        let bar = visible.then(|| {
            let pb = ProgressBar::new(limit);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        });
        Self { bar, limit }
    }

    pub fn hidden() -> Self {
        Self {
            bar: None,
            limit: 0,
        }
    }

    /// Refresh from `stats`; `accepted` includes records not yet committed.
    pub fn update(&self, stats: &ImportStats, accepted: u64) {
        let Some(pb) = &self.bar else { return };
        pb.set_position(accepted.min(self.limit));
        let eta = stats
            .eta(self.limit)
            .map_or_else(|| "-".to_string(), |d| format!("{}s", d.as_secs()));
        pb.set_message(format!(
            "{:.0} rec/s | ETA {} | skipped {}",
            stats.rate(),
            eta,
            stats.examined.saturating_sub(accepted)
        ));
    }

    pub fn finish(&self, summary: &ImportSummary) {
        if let Some(pb) = &self.bar {
            let msg = format!(
                "{} imported, {:.1} rec/s",
                summary.imported, summary.records_per_sec
            );
            if summary.interrupted {
                pb.abandon_with_message(format!("Interrupted: {msg}"));
            } else {
                pb.finish_with_message(format!("Done: {msg}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::InvalidField;

    #[test]
    fn eta_follows_rate() {
        let elapsed = Duration::from_secs(10);
        assert_eq!(rate(500, elapsed), 50.0);
        assert_eq!(eta(500, 1000, elapsed), Some(Duration::from_secs(10)));
        assert_eq!(eta(0, 1000, elapsed), None);
        assert_eq!(eta(1000, 1000, elapsed), None);
        assert_eq!(rate(10, Duration::ZERO), 0.0);
    }

    #[test]
    fn counters_balance() {
        let mut stats = ImportStats::new();
        for _ in 0..7 {
            stats.record_examined();
        }
        stats.record_skip(&SkipReason::Existing);
        stats.record_skip(&InvalidField::MissingTitle.into());
        stats.record_skip(&FilterReason::Adult.into());
        stats.record_skip(&SkipReason::ParseError {
            message: "bad".into(),
        });
        stats.record_batch(&BatchOutcome {
            attempted: 3,
            committed: 1,
            ignored: 1,
            failed: 1,
            fell_back: true,
        });
        let summary = stats.summary(ImportState::Exhausted);
        assert!(summary.is_consistent());
        assert_eq!(summary.skipped_existing, 2);
        assert_eq!(summary.skipped_filtered.adult, 1);
        assert_eq!(summary.commit_failed, 1);
        assert!(!summary.interrupted);

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"state\": \"exhausted\""));
    }
}
