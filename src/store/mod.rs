//! Persistent storage boundary.
//!
//! The pipeline only needs three operations from storage: the ids it already
//! holds, a conflict-ignoring bulk insert, and a single-record insert used when
//! a bulk insert fails. [`SqliteStore`] is the real catalog;
//! [`MemoryStore`] backs tests and `--dry-run`.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::record::CanonicalMovieRecord;
use anyhow::Result;
use std::collections::HashSet;

pub trait MovieStore {
    /// Every external id currently stored. Called once per run.
    fn query_existing_ids(&self) -> Result<HashSet<i64>>;

    /// Insert `records`, silently skipping ids that already exist.
    ///
    /// Returns the number of rows actually written. An `Err` means nothing
    /// from this batch was written.
    fn bulk_insert_ignore_conflicts(&mut self, records: &[CanonicalMovieRecord]) -> Result<usize>;

    /// Insert a single record; a duplicate id is an error here.
    fn insert_one(&mut self, record: &CanonicalMovieRecord) -> Result<()>;

    /// Total number of stored movies.
    fn count(&self) -> Result<u64>;
}
