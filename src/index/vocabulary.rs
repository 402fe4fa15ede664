use std::collections::HashSet;

/// Set of original (non-prefix) terms seen by the index. Fuels fuzzy
/// expansion. Append-only for the session; `clear` is the only removal.
#[derive(Debug, Default)]
pub struct Vocabulary {
    terms: HashSet<String>,
    dirty: bool,
}

impl Vocabulary {
    pub fn new() -> Self {
        Vocabulary::default()
    }

    /// Inserts a term, returning true (and marking the vocabulary dirty)
    /// when it was not present before.
    pub fn insert(&mut self, term: &str) -> bool {
        let inserted = self.terms.insert(term.to_string());
        if inserted {
            self.dirty = true;
        }
        inserted
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Forces a persistence pass, e.g. after replacing the set from a
    /// snapshot import.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Stable (sorted) term list for the persisted blob.
    pub fn snapshot(&self) -> Vec<String> {
        let mut terms: Vec<String> = self.terms.iter().cloned().collect();
        terms.sort();
        terms
    }

    /// Replaces the whole set, e.g. from the persisted blob on warm restart.
    pub fn load(&mut self, terms: Vec<String>) {
        self.terms = terms.into_iter().collect();
        self.dirty = false;
    }

    pub fn clear(&mut self) {
        self.terms.clear();
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_and_tracks_dirt() {
        let mut vocab = Vocabulary::new();
        assert!(vocab.insert("fox"));
        assert!(!vocab.insert("fox"));
        assert!(vocab.is_dirty());
        vocab.mark_clean();
        assert!(!vocab.insert("fox"));
        assert!(!vocab.is_dirty());
    }

    #[test]
    fn snapshot_is_sorted_and_loads_back() {
        let mut vocab = Vocabulary::new();
        vocab.insert("zebra");
        vocab.insert("ant");
        assert_eq!(vocab.snapshot(), vec!["ant".to_string(), "zebra".to_string()]);

        let mut restored = Vocabulary::new();
        restored.load(vocab.snapshot());
        assert!(restored.contains("zebra"));
        assert!(!restored.is_dirty());
    }
}
