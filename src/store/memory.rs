use super::MovieStore;
use crate::record::CanonicalMovieRecord;
use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashSet};

/// In-memory [`MovieStore`] with failure injection.
///
/// A bulk insert containing a poisoned id fails as a whole, like a database
/// batch that hits a bad row; the same id also fails on `insert_one`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: BTreeMap<i64, CanonicalMovieRecord>,
    fail_batches: bool,
    poisoned: HashSet<i64>,
    batch_calls: u64,
    single_calls: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with `records`.
    pub fn with_records(records: impl IntoIterator<Item = CanonicalMovieRecord>) -> Self {
        let mut store = Self::new();
        for r in records {
            store.rows.insert(r.external_id, r);
        }
        store
    }

    /// Make every bulk insert fail.
    #[must_use]
    pub fn failing_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    /// Make any write that includes one of `ids` fail.
    #[must_use]
    pub fn poison(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.poisoned.extend(ids);
        self
    }

    pub fn get(&self, external_id: i64) -> Option<&CanonicalMovieRecord> {
        self.rows.get(&external_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &CanonicalMovieRecord> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of `bulk_insert_ignore_conflicts` calls.
    pub fn batch_calls(&self) -> u64 {
        self.batch_calls
    }

    /// Number of `insert_one` calls.
    pub fn single_calls(&self) -> u64 {
        self.single_calls
    }
}

impl MovieStore for MemoryStore {
    fn query_existing_ids(&self) -> Result<HashSet<i64>> {
        Ok(self.rows.keys().copied().collect())
    }

    fn bulk_insert_ignore_conflicts(&mut self, records: &[CanonicalMovieRecord]) -> Result<usize> {
        self.batch_calls += 1;
        if self.fail_batches {
            bail!("batch insert rejected");
        }
        if let Some(bad) = records.iter().find(|r| self.poisoned.contains(&r.external_id)) {
            bail!("constraint violation on movie {}", bad.external_id);
        }
        let mut written = 0;
        for r in records {
            if !self.rows.contains_key(&r.external_id) {
                self.rows.insert(r.external_id, r.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    fn insert_one(&mut self, record: &CanonicalMovieRecord) -> Result<()> {
        self.single_calls += 1;
        if self.poisoned.contains(&record.external_id) {
            bail!("constraint violation on movie {}", record.external_id);
        }
        if self.rows.contains_key(&record.external_id) {
            bail!("duplicate movie {}", record.external_id);
        }
        self.rows.insert(record.external_id, record.clone());
        Ok(())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}
