use std::collections::{HashMap, HashSet};

use crate::core::types::{DocId, TermPosting, TokenMetadata};

/// One in-memory posting: frequency plus the metadata recorded at ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingEntry {
    pub doc_id: DocId,
    pub term_frequency: f64,
    pub metadata: Option<TokenMetadata>,
}

impl PostingEntry {
    pub fn to_term_posting(&self) -> TermPosting {
        TermPosting {
            doc_id: self.doc_id.clone(),
            term_frequency: self.term_frequency,
            metadata: self.metadata.clone(),
        }
    }
}

/// Work collected from one walk of the dirty set: chunks to write and
/// `(field, term)` pairs whose lists emptied out and must be deleted from
/// storage.
#[derive(Debug, Default)]
pub struct FlushWork {
    pub writes: Vec<(String, String, Vec<TermPosting>)>,
    pub deletions: Vec<(String, String)>,
}

/// In-memory inverted index: `field → term → doc key → posting`, plus the
/// dirty set of `(field, term)` pairs whose state differs from storage.
#[derive(Debug, Default)]
pub struct PostingsStore {
    postings: HashMap<String, HashMap<String, HashMap<String, PostingEntry>>>,
    dirty: HashSet<(String, String)>,
}

impl PostingsStore {
    pub fn new() -> Self {
        PostingsStore::default()
    }

    /// Writes or overwrites a posting and marks the term dirty.
    pub fn upsert(
        &mut self,
        field: &str,
        term: &str,
        doc_id: &DocId,
        term_frequency: f64,
        metadata: Option<TokenMetadata>,
    ) {
        let doc_key = doc_id.key().into_owned();
        self.postings
            .entry(field.to_string())
            .or_default()
            .entry(term.to_string())
            .or_default()
            .insert(
                doc_key,
                PostingEntry {
                    doc_id: doc_id.clone(),
                    term_frequency,
                    metadata,
                },
            );
        self.dirty.insert((field.to_string(), term.to_string()));
    }

    pub fn get(&self, field: &str, term: &str) -> Option<&HashMap<String, PostingEntry>> {
        self.postings.get(field)?.get(term)
    }

    /// Removes a document from every posting list currently in memory,
    /// marking each affected term dirty. Lists that empty out stay in the
    /// map until the next flush walk schedules their deletion.
    pub fn remove_document(&mut self, doc_key: &str) -> Vec<(String, String)> {
        let mut affected = Vec::new();
        for (field, terms) in &mut self.postings {
            for (term, docs) in terms.iter_mut() {
                if docs.remove(doc_key).is_some() {
                    affected.push((field.clone(), term.clone()));
                }
            }
        }
        for pair in &affected {
            self.dirty.insert(pair.clone());
        }
        affected
    }

    /// Walks the dirty set once, splitting it into chunk writes (non-empty
    /// lists) and deletions (emptied lists, which are also dropped from the
    /// in-memory map). The dirty set itself is left untouched so a failed
    /// flush can retry; call [`clear_dirty`](Self::clear_dirty) once the
    /// writes landed.
    pub fn collect_flush_work(&mut self) -> FlushWork {
        let mut work = FlushWork::default();
        for (field, term) in &self.dirty {
            let docs = self.postings.get(field).and_then(|terms| terms.get(term));
            match docs {
                Some(docs) if !docs.is_empty() => {
                    let list = docs.values().map(PostingEntry::to_term_posting).collect();
                    work.writes.push((field.clone(), term.clone(), list));
                }
                _ => work.deletions.push((field.clone(), term.clone())),
            }
        }
        for (field, term) in &work.deletions {
            if let Some(terms) = self.postings.get_mut(field) {
                terms.remove(term);
                if terms.is_empty() {
                    self.postings.remove(field);
                }
            }
        }
        work
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    /// Iterates every `(field, term, postings)` triple in memory.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&String, &String, &HashMap<String, PostingEntry>)> {
        self.postings.iter().flat_map(|(field, terms)| {
            terms.iter().map(move |(term, docs)| (field, term, docs))
        })
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(store: &PostingsStore, field: &str, term: &str, key: &str) -> Option<f64> {
        store
            .get(field, term)
            .and_then(|docs| docs.get(key))
            .map(|p| p.term_frequency)
    }

    #[test]
    fn upsert_marks_dirty_and_overwrites() {
        let mut store = PostingsStore::new();
        store.upsert("title", "fox", &DocId::from("doc-1"), 1.0, None);
        store.upsert("title", "fox", &DocId::from("doc-1"), 3.0, None);
        assert_eq!(posting(&store, "title", "fox", "doc-1"), Some(3.0));
        assert_eq!(store.dirty_len(), 1);
    }

    #[test]
    fn integer_and_string_ids_share_a_key() {
        let mut store = PostingsStore::new();
        store.upsert("title", "fox", &DocId::Integer(1), 1.0, None);
        store.upsert("title", "fox", &DocId::Text("1".into()), 2.0, None);
        assert_eq!(store.get("title", "fox").unwrap().len(), 1);
        assert_eq!(posting(&store, "title", "fox", "1"), Some(2.0));
    }

    #[test]
    fn remove_document_touches_every_list() {
        let mut store = PostingsStore::new();
        store.upsert("title", "fox", &DocId::from("doc-1"), 1.0, None);
        store.upsert("body", "dog", &DocId::from("doc-1"), 1.0, None);
        store.upsert("body", "dog", &DocId::from("doc-2"), 1.0, None);
        store.clear_dirty();

        let mut affected = store.remove_document("doc-1");
        affected.sort();
        assert_eq!(
            affected,
            vec![
                ("body".to_string(), "dog".to_string()),
                ("title".to_string(), "fox".to_string())
            ]
        );
        assert_eq!(store.dirty_len(), 2);
        assert!(store.get("title", "fox").unwrap().is_empty());
        assert_eq!(store.get("body", "dog").unwrap().len(), 1);
    }

    #[test]
    fn flush_work_splits_writes_and_deletions() {
        let mut store = PostingsStore::new();
        store.upsert("title", "fox", &DocId::from("doc-1"), 1.0, None);
        store.upsert("title", "dog", &DocId::from("doc-1"), 1.0, None);
        store.remove_document("doc-1");
        store.upsert("title", "fox", &DocId::from("doc-2"), 2.0, None);

        let mut work = store.collect_flush_work();
        assert_eq!(work.writes.len(), 1);
        assert_eq!(work.writes[0].0, "title");
        assert_eq!(work.writes[0].1, "fox");
        work.deletions.sort();
        assert_eq!(work.deletions, vec![("title".to_string(), "dog".to_string())]);

        // Emptied list was dropped from memory; dirty set survives until
        // writes are confirmed.
        assert!(store.get("title", "dog").is_none());
        assert_eq!(store.dirty_len(), 2);
        store.clear_dirty();
        assert_eq!(store.dirty_len(), 0);
    }
}
