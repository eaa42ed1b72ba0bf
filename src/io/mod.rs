//! Dataset readers.
//!
//! Both dump formats are read through the same [`RecordSource`] capability: a
//! lazy, pull-based sequence of [`RawEntry`] values plus the filters that only
//! make sense for that format. [`open_source`] picks the implementation once,
//! using [`crate::detect::detect_format`].

pub mod compression;
pub mod glob;
pub mod hierarchical;
pub mod tabular;

use crate::config::ImportFilters;
use crate::detect::detect_format;
use crate::record::SourceFormat;
use crate::validation::{FilterReason, Skip};
use anyhow::Result;
use std::path::Path;

pub use hierarchical::{HierarchicalEntry, HierarchicalReader, StreamStrategy};
pub use tabular::{TabularReader, TabularRow};

/// One decoded entry, still in its source-specific shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEntry {
    Tabular(TabularRow),
    Hierarchical(HierarchicalEntry),
}

impl RawEntry {
    pub fn format(&self) -> SourceFormat {
        match self {
            RawEntry::Tabular(_) => SourceFormat::Tabular,
            RawEntry::Hierarchical(_) => SourceFormat::Hierarchical,
        }
    }

    /// Line (CSV, line-delimited JSON) or item index (JSON array) in the source.
    pub fn position(&self) -> u64 {
        match self {
            RawEntry::Tabular(row) => row.line,
            RawEntry::Hierarchical(e) => e.position,
        }
    }
}

/// A lazy sequence of raw entries from one dataset file.
///
/// Items are `Err(Skip)` for entries that could not be decoded or lack an id or
/// title; the caller counts them and moves on. A source never aborts on a bad
/// entry.
pub trait RecordSource {
    fn format(&self) -> SourceFormat;

    /// Label used in logs and the reject log (usually the file path).
    fn label(&self) -> &str;

    /// Pull the next entry; `None` once the input is exhausted.
    fn next_entry(&mut self) -> Option<Result<RawEntry, Skip>>;

    /// The format-specific filter that excludes `entry`, if any.
    fn filter(&self, entry: &RawEntry, filters: &ImportFilters) -> Option<FilterReason>;
}

/// Open `path` with the reader matching its detected format.
///
/// # Errors
/// Fails if the file cannot be opened or its header cannot be read.
pub fn open_source(path: impl AsRef<Path>) -> Result<Box<dyn RecordSource>> {
    let path = path.as_ref();
    let source: Box<dyn RecordSource> = match detect_format(path) {
        SourceFormat::Tabular => Box::new(TabularReader::open(path)?),
        SourceFormat::Hierarchical => Box::new(HierarchicalReader::open(path)?),
    };
    Ok(source)
}
