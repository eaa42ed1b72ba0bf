//! In-run set of known external ids.
//!
//! Seeded once from the store, then grown as records are accepted. Its size is
//! proportional to the number of distinct ids ever seen (store plus run); this
//! is the one structure whose memory grows with the input.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DeduplicationIndex {
    seen: HashSet<i64>,
}

impl DeduplicationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add ids already present in the store.
    pub fn seed(&mut self, existing: impl IntoIterator<Item = i64>) {
        self.seen.extend(existing);
    }

    /// `true` the first time `id` is offered, `false` afterwards.
    pub fn accept_or_reject(&mut self, id: i64) -> bool {
        self.seen.insert(id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_each_id_once() {
        let mut idx = DeduplicationIndex::new();
        idx.seed([1, 2]);
        assert!(!idx.accept_or_reject(1));
        assert!(idx.accept_or_reject(3));
        assert!(!idx.accept_or_reject(3));
        assert!(idx.contains(3));
        assert_eq!(idx.len(), 3);
    }
}
