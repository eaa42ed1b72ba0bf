//! Rejection taxonomy and record validation.
//!
//! Malformed and filtered input is ordinary control flow in an import run:
//! every entry that does not become a committed row is classified by a
//! [`SkipReason`] and counted. Nothing here is an `Err` in the `anyhow` sense;
//! fatal problems (an unreadable file, an unopenable store) are reported
//! elsewhere before any record is processed.
//!
//! # Overview
//!
//! - [`SkipReason`] - why an entry was dropped (parse, invalid, filtered, existing, commit)
//! - [`Validate`] - the final gate a canonical record must pass
//! - [`validators`] - small reusable checks used by the normalizer
//! - [`RejectLog`] - a bounded sample of rejected entries for later inspection

use crate::record::{CanonicalMovieRecord, MAX_RELEASE_YEAR, MIN_RELEASE_YEAR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;

/// Why a decoded entry failed the required-field checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidField {
    MissingId,
    MissingTitle,
    MissingReleaseYear,
    ReleaseYearOutOfRange,
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvalidField::MissingId => "missing or non-positive id",
            InvalidField::MissingTitle => "missing title",
            InvalidField::MissingReleaseYear => "missing or unparseable release year",
            InvalidField::ReleaseYearOutOfRange => "release year out of range",
        };
        f.write_str(s)
    }
}

/// Which configured filter excluded an otherwise valid entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    Adult,
    Unpopular,
    Unreleased,
    LowVotes,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterReason::Adult => "adult content",
            FilterReason::Unpopular => "below popularity threshold",
            FilterReason::Unreleased => "not released",
            FilterReason::LowVotes => "below vote threshold",
        };
        f.write_str(s)
    }
}

/// Classified outcome for an entry that is not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The row/line/object could not be decoded at all.
    ParseError { message: String },
    /// Decoded, but a required field is missing or out of range.
    Invalid { field: InvalidField },
    /// Decoded and valid, but excluded by a configured threshold.
    Filtered { filter: FilterReason },
    /// Valid, but its external id was already accepted or stored.
    Existing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ParseError { message } => write!(f, "parse error: {message}"),
            SkipReason::Invalid { field } => write!(f, "invalid: {field}"),
            SkipReason::Filtered { filter } => write!(f, "filtered: {filter}"),
            SkipReason::Existing => f.write_str("already exists"),
        }
    }
}

impl From<InvalidField> for SkipReason {
    fn from(field: InvalidField) -> Self {
        SkipReason::Invalid { field }
    }
}

impl From<FilterReason> for SkipReason {
    fn from(filter: FilterReason) -> Self {
        SkipReason::Filtered { filter }
    }
}

/// A skipped entry together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    /// 1-based line (tabular, line-oriented JSON) or item index (JSON array).
    pub position: u64,
    pub reason: SkipReason,
}

impl Skip {
    pub fn parse(position: u64, message: impl Into<String>) -> Self {
        Self {
            position,
            reason: SkipReason::ParseError {
                message: message.into(),
            },
        }
    }

    pub fn invalid(position: u64, field: InvalidField) -> Self {
        Self {
            position,
            reason: field.into(),
        }
    }
}

/// Types that can check their own invariants.
pub trait Validate {
    /// Return the first violated invariant, if any.
    fn validate(&self) -> Result<(), InvalidField>;
}

impl Validate for CanonicalMovieRecord {
    fn validate(&self) -> Result<(), InvalidField> {
        if self.external_id <= 0 {
            return Err(InvalidField::MissingId);
        }
        if validators::is_blank(&self.title) {
            return Err(InvalidField::MissingTitle);
        }
        if !validators::in_range(self.release_year, MIN_RELEASE_YEAR, MAX_RELEASE_YEAR) {
            return Err(InvalidField::ReleaseYearOutOfRange);
        }
        Ok(())
    }
}

/// Small reusable checks.
pub mod validators {
    /// Empty or whitespace-only.
    pub fn is_blank(value: &str) -> bool {
        value.trim().is_empty()
    }

    /// `min <= value <= max`.
    pub fn in_range<T: PartialOrd>(value: T, min: T, max: T) -> bool {
        value >= min && value <= max
    }
}

/// A rejected entry kept for the reject log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectEntry {
    pub source: String,
    pub position: u64,
    pub reason: SkipReason,
}

/// Keeps the first `capacity` rejections of a run; later ones are only counted.
#[derive(Debug, Clone, Default)]
pub struct RejectLog {
    capacity: usize,
    entries: Vec<RejectEntry>,
    overflow: u64,
}

impl RejectLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            overflow: 0,
        }
    }

    pub fn record(&mut self, source: &str, position: u64, reason: &SkipReason) {
        if self.entries.len() < self.capacity {
            self.entries.push(RejectEntry {
                source: source.to_string(),
                position,
                reason: reason.clone(),
            });
        } else {
            self.overflow += 1;
        }
    }

    pub fn entries(&self) -> &[RejectEntry] {
        &self.entries
    }

    /// Rejections seen after the log was full.
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Write the kept entries to `path` as pretty JSON.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_log_is_bounded() {
        let mut log = RejectLog::new(2);
        for i in 0..5 {
            log.record("a.csv", i, &SkipReason::Existing);
        }
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.overflow(), 3);
        let json = log.to_json().unwrap();
        assert!(json.contains("\"kind\": \"existing\""));
    }

    #[test]
    fn skip_reason_display() {
        let r: SkipReason = FilterReason::LowVotes.into();
        assert_eq!(r.to_string(), "filtered: below vote threshold");
        let r: SkipReason = InvalidField::MissingTitle.into();
        assert_eq!(r.to_string(), "invalid: missing title");
    }
}
