//! Fixed-size batching of accepted records into the store.

use crate::record::CanonicalMovieRecord;
use crate::store::MovieStore;
use tracing::{debug, warn};

/// What happened to one flushed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records handed to the store.
    pub attempted: usize,
    /// Rows actually written.
    pub committed: usize,
    /// Records the store skipped because their id was already present.
    pub ignored: usize,
    /// Records that failed even on their individual retry.
    pub failed: usize,
    /// Whether the bulk insert failed and records were retried one by one.
    pub fell_back: bool,
}

/// Buffers records and commits them in batches of `batch_size`.
///
/// A failed bulk insert is retried record by record so that one bad record
/// only costs itself.
pub struct BatchCommitter<S: MovieStore> {
    store: S,
    batch_size: usize,
    pending: Vec<CanonicalMovieRecord>,
    flushes: u64,
}

impl<S: MovieStore> BatchCommitter<S> {
    pub fn new(store: S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            batch_size,
            pending: Vec::with_capacity(batch_size.min(4096)),
            flushes: 0,
        }
    }

    /// Queue `record`; flushes and returns the outcome once the batch is full.
    pub fn push(&mut self, record: CanonicalMovieRecord) -> Option<BatchOutcome> {
        self.pending.push(record);
        (self.pending.len() >= self.batch_size).then(|| self.flush())
    }

    /// Commit whatever is pending. An empty buffer is a no-op.
    pub fn flush(&mut self) -> BatchOutcome {
        if self.pending.is_empty() {
            return BatchOutcome::default();
        }
        let batch = std::mem::take(&mut self.pending);
        self.flushes += 1;
        let attempted = batch.len();

        match self.store.bulk_insert_ignore_conflicts(&batch) {
            Ok(written) => {
                let committed = written.min(attempted);
                debug!(attempted, committed, "batch committed");
                BatchOutcome {
                    attempted,
                    committed,
                    ignored: attempted - committed,
                    ..Default::default()
                }
            }
            Err(e) => {
                warn!(
                    records = attempted,
                    error = %format!("{e:#}"),
                    "batch commit failed, retrying records individually"
                );
                let mut outcome = BatchOutcome {
                    attempted,
                    fell_back: true,
                    ..Default::default()
                };
                for record in &batch {
                    match self.store.insert_one(record) {
                        Ok(()) => outcome.committed += 1,
                        Err(e) => {
                            outcome.failed += 1;
                            warn!(
                                external_id = record.external_id,
                                error = %format!("{e:#}"),
                                "record commit failed"
                            );
                        }
                    }
                }
                outcome
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Non-empty flushes so far.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceFormat;
    use crate::store::MemoryStore;

    fn movie(id: i64) -> CanonicalMovieRecord {
        CanonicalMovieRecord {
            external_id: id,
            title: format!("Movie {id}"),
            original_title: String::new(),
            release_year: 2000,
            released: "2000-01-01".into(),
            genres: Vec::new(),
            overview: String::new(),
            poster_url: String::new(),
            popularity: 1.0,
            runtime: None,
            external_rating: None,
            external_vote_count: None,
            imdb_id: String::new(),
            imdb_rating: None,
            imdb_votes_display: String::new(),
            language: String::new(),
            country: String::new(),
            production_companies: Vec::new(),
            cast_names: Vec::new(),
            director_names: Vec::new(),
            writer_names: Vec::new(),
            release_status: String::new(),
            revenue_display: String::new(),
            source: SourceFormat::Tabular,
        }
    }

    #[test]
    fn flushes_when_full() {
        let mut c = BatchCommitter::new(MemoryStore::new(), 2);
        assert!(c.push(movie(1)).is_none());
        let out = c.push(movie(2)).unwrap();
        assert_eq!(out.committed, 2);
        assert_eq!(c.pending(), 0);
        assert!(c.push(movie(3)).is_none());
        assert_eq!(c.flush().committed, 1);
        assert_eq!(c.flush(), BatchOutcome::default());
        assert_eq!(c.flushes(), 2);
    }

    #[test]
    fn bad_record_only_costs_itself() {
        let store = MemoryStore::new().poison([2]);
        let mut c = BatchCommitter::new(store, 10);
        for id in 1..=4 {
            c.push(movie(id));
        }
        let out = c.flush();
        assert!(out.fell_back);
        assert_eq!(out.committed, 3);
        assert_eq!(out.failed, 1);
        let store = c.into_store();
        assert!(store.get(2).is_none());
        assert_eq!(store.len(), 3);
        assert_eq!(store.single_calls(), 4);
    }

    #[test]
    fn conflicts_are_ignored_not_failed() {
        let store = MemoryStore::with_records([movie(1)]);
        let mut c = BatchCommitter::new(store, 10);
        c.push(movie(1));
        c.push(movie(2));
        let out = c.flush();
        assert_eq!(out.committed, 1);
        assert_eq!(out.ignored, 1);
        assert!(!out.fell_back);
    }
}
