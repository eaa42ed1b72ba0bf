//! Import run configuration.
//!
//! [`ImportOptions`] is what the supervisor consumes. The binary fills it from
//! command-line flags and `CINELOAD_*` environment variables; tests and library
//! callers build it directly, usually starting from [`Default`].

use crate::record::FieldLimits;

/// Default cap on records accepted in one run.
pub const DEFAULT_LIMIT: u64 = 1_000_000;
/// Default number of records per commit.
pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// Default interval (in examined records) between progress log lines.
pub const DEFAULT_PROGRESS_EVERY: u64 = 10_000;
/// Default number of rejections kept in the reject log.
pub const DEFAULT_REJECT_LOG_CAPACITY: usize = 10_000;

/// Format-specific entry filters.
///
/// `include_adult` and `min_popularity` apply to the JSON dump; `only_released`
/// and `min_votes` apply to the CSV dump.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFilters {
    pub include_adult: bool,
    pub min_popularity: f64,
    pub only_released: bool,
    pub min_votes: i64,
}

impl Default for ImportFilters {
    fn default() -> Self {
        Self {
            include_adult: false,
            min_popularity: 0.0,
            only_released: true,
            min_votes: 0,
        }
    }
}

/// Everything one import run needs besides its inputs and store.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Stop once this many records have been accepted.
    pub limit: u64,
    /// Records per commit; values below 1 are treated as 1.
    pub batch_size: usize,
    pub filters: ImportFilters,
    pub limits: FieldLimits,
    /// Emit an `info` progress line every this many examined entries (0 disables).
    pub progress_every: u64,
    /// Draw an interactive progress bar on stderr.
    pub show_progress: bool,
    /// Keep up to this many rejections for the reject log (0 disables).
    pub reject_log_capacity: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            filters: ImportFilters::default(),
            limits: FieldLimits::CATALOG,
            progress_every: DEFAULT_PROGRESS_EVERY,
            show_progress: false,
            reject_log_capacity: 0,
        }
    }
}

impl ImportOptions {
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: ImportFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let o = ImportOptions::default();
        assert_eq!(o.limit, 1_000_000);
        assert_eq!(o.batch_size, 1000);
        assert!(o.filters.only_released);
        assert!(!o.filters.include_adult);
        assert_eq!(o.filters.min_votes, 0);
        assert_eq!(o.limits, FieldLimits::CATALOG);
    }

    #[test]
    fn batch_size_is_at_least_one() {
        assert_eq!(ImportOptions::default().with_batch_size(0).batch_size, 1);
        let o = ImportOptions {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(o.effective_batch_size(), 1);
    }
}
