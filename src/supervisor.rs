//! Orchestration of one import run.
//!
//! The supervisor walks a fixed state sequence:
//!
//! ```text
//! Initializing -> Streaming -> (Interrupted | Exhausted) -> Finalizing -> Done
//! ```
//!
//! - **Initializing** opens every input (so a missing file fails before any
//!   record is read) and seeds the [`DeduplicationIndex`] from the store.
//! - **Streaming** pulls entries one at a time: filter, normalize, dedup, then
//!   queue in the [`BatchCommitter`]. It stops when the source is drained or the
//!   record limit is met (`Exhausted`) or the [`CancelToken`] is set
//!   (`Interrupted`). Cancellation is only observed between entries.
//! - **Finalizing** flushes the pending batch exactly once.
//!
//! Several inputs share one index, one set of counters, and one limit, so the
//! first occurrence of an id wins across files.

use crate::commit::BatchCommitter;
use crate::config::ImportOptions;
use crate::dedup::DeduplicationIndex;
use crate::io::{RawEntry, RecordSource, open_source};
use crate::metrics::{ImportStats, ImportSummary, ProgressReporter};
use crate::normalize::normalize;
use crate::store::MovieStore;
use crate::validation::{RejectLog, Skip, SkipReason};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Entries between progress bar refreshes.
const PROGRESS_REFRESH: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    Initializing,
    Streaming,
    Interrupted,
    Exhausted,
    Finalizing,
    Done,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportState::Initializing => "initializing",
            ImportState::Streaming => "streaming",
            ImportState::Interrupted => "interrupted",
            ImportState::Exhausted => "exhausted",
            ImportState::Finalizing => "finalizing",
            ImportState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Shared flag asking a running import to stop at the next entry boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives sources through normalization and dedup into a [`MovieStore`].
///
/// One supervisor performs one run; counters are not reset between runs.
pub struct ImportSupervisor<S: MovieStore> {
    options: ImportOptions,
    committer: BatchCommitter<S>,
    dedup: DeduplicationIndex,
    stats: ImportStats,
    state: ImportState,
    cancel: CancelToken,
    reject_log: Option<RejectLog>,
    progress: ProgressReporter,
    /// Records accepted by the index, committed or still pending.
    accepted: u64,
}

impl<S: MovieStore> ImportSupervisor<S> {
    pub fn new(store: S, options: ImportOptions) -> Self {
        let progress = if options.show_progress {
            ProgressReporter::new(options.limit, true)
        } else {
            ProgressReporter::hidden()
        };
        let reject_log =
            (options.reject_log_capacity > 0).then(|| RejectLog::new(options.reject_log_capacity));
        Self {
            committer: BatchCommitter::new(store, options.effective_batch_size()),
            dedup: DeduplicationIndex::new(),
            stats: ImportStats::new(),
            state: ImportState::Initializing,
            cancel: CancelToken::new(),
            reject_log,
            progress,
            accepted: 0,
            options,
        }
    }

    /// Use an externally owned token (e.g. one set by a signal handler).
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    pub fn reject_log(&self) -> Option<&RejectLog> {
        self.reject_log.as_ref()
    }

    pub fn store(&self) -> &S {
        self.committer.store()
    }

    /// Number of non-empty commits issued so far.
    pub fn commit_calls(&self) -> u64 {
        self.committer.flushes()
    }

    pub fn into_store(self) -> S {
        self.committer.into_store()
    }

    /// Import every file in `paths`, in order.
    ///
    /// # Errors
    /// Fails before reading any record if an input cannot be opened or the
    /// store cannot be queried. Bad entries never fail the run.
    pub fn run(&mut self, paths: &[PathBuf]) -> Result<ImportSummary> {
        self.transition(ImportState::Initializing);
        let sources = paths
            .iter()
            .map(|path| {
                let source = open_source(path)?;
                info!(source = source.label(), format = %source.format(), "input detected");
                Ok(source)
            })
            .collect::<Result<Vec<_>>>()?;
        self.run_sources(sources)
    }

    /// Import from already opened sources.
    ///
    /// # Errors
    /// Fails if the store cannot report its existing ids.
    pub fn run_sources(&mut self, sources: Vec<Box<dyn RecordSource>>) -> Result<ImportSummary> {
        self.transition(ImportState::Initializing);
        let existing = self
            .committer
            .store()
            .query_existing_ids()
            .context("query existing movie ids")?;
        info!(existing = existing.len(), "dedup index seeded");
        self.dedup.seed(existing);

        self.transition(ImportState::Streaming);
        let terminal = self.stream(sources);
        self.transition(terminal);

        self.transition(ImportState::Finalizing);
        let outcome = self.committer.flush();
        self.stats.record_batch(&outcome);

        self.transition(ImportState::Done);
        let summary = self.stats.summary(terminal);
        self.progress.finish(&summary);
        info!(
            imported = summary.imported,
            skipped_existing = summary.skipped_existing,
            skipped_invalid = summary.skipped_invalid,
            skipped_parse = summary.skipped_parse,
            skipped_filtered = summary.skipped_filtered.total(),
            commit_failed = summary.commit_failed,
            elapsed_secs = summary.elapsed_secs,
            records_per_sec = summary.records_per_sec,
            state = %terminal,
            "import finished"
        );
        Ok(summary)
    }

    fn transition(&mut self, next: ImportState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "import state");
            self.state = next;
        }
    }

    fn stream(&mut self, sources: Vec<Box<dyn RecordSource>>) -> ImportState {
        for mut source in sources {
            info!(source = source.label(), format = %source.format(), "streaming");
            loop {
                if self.cancel.is_cancelled() {
                    info!(accepted = self.accepted, "interrupt received");
                    return ImportState::Interrupted;
                }
                if self.accepted >= self.options.limit {
                    info!(limit = self.options.limit, "record limit reached");
                    return ImportState::Exhausted;
                }
                let Some(item) = source.next_entry() else {
                    break;
                };
                self.stats.record_examined();
                self.process(&*source, item);
                self.report_progress();
            }
        }
        ImportState::Exhausted
    }

    fn process(&mut self, source: &dyn RecordSource, item: Result<RawEntry, Skip>) {
        let entry = match item {
            Ok(entry) => entry,
            Err(skip) => {
                if let SkipReason::ParseError { message } = &skip.reason {
                    debug!(source = source.label(), position = skip.position, %message, "parse error");
                }
                return self.reject(source.label(), skip.position, skip.reason);
            }
        };
        let position = entry.position();

        if let Some(filter) = source.filter(&entry, &self.options.filters) {
            return self.reject(source.label(), position, filter.into());
        }
        let record = match normalize(&entry, &self.options.limits) {
            Ok(record) => record,
            Err(field) => return self.reject(source.label(), position, field.into()),
        };
        if !self.dedup.accept_or_reject(record.external_id) {
            return self.reject(source.label(), position, SkipReason::Existing);
        }

        self.accepted += 1;
        if let Some(outcome) = self.committer.push(record) {
            self.stats.record_batch(&outcome);
        }
    }

    fn reject(&mut self, label: &str, position: u64, reason: SkipReason) {
        self.stats.record_skip(&reason);
        if let Some(log) = self.reject_log.as_mut() {
            log.record(label, position, &reason);
        }
    }

    fn report_progress(&self) {
        let examined = self.stats.examined;
        if examined % PROGRESS_REFRESH == 0 {
            self.progress.update(&self.stats, self.accepted);
        }
        let every = self.options.progress_every;
        if every > 0 && examined % every == 0 {
            info!(
                examined,
                accepted = self.accepted,
                imported = self.stats.imported,
                rate = %format_args!("{:.1}", self.stats.rate()),
                eta_secs = self.stats.eta(self.options.limit).map(|d| d.as_secs()),
                "progress"
            );
        }
    }
}
