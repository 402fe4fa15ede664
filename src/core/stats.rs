use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-document total token length, with the running average used by the
/// scorer's length normalisation.
#[derive(Debug, Clone, Default)]
pub struct DocumentStats {
    lengths: HashMap<String, u64>,
    total_length: u64,
}

/// One entry of a stats snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocLengthEntry {
    pub doc_id: String,
    pub length: u64,
}

impl DocumentStats {
    pub fn new() -> Self {
        DocumentStats::default()
    }

    /// Stores or overwrites a document's length, adjusting the totals.
    pub fn add_document(&mut self, doc_key: &str, length: u64) {
        if let Some(previous) = self.lengths.insert(doc_key.to_string(), length) {
            self.total_length -= previous;
        }
        self.total_length += length;
    }

    pub fn remove_document(&mut self, doc_key: &str) {
        if let Some(previous) = self.lengths.remove(doc_key) {
            self.total_length -= previous;
        }
    }

    pub fn length(&self, doc_key: &str) -> Option<u64> {
        self.lengths.get(doc_key).copied()
    }

    pub fn document_count(&self) -> usize {
        self.lengths.len()
    }

    /// Average document length, or 1 when empty so scoring never divides by
    /// zero.
    pub fn average_length(&self) -> f64 {
        if self.lengths.is_empty() {
            1.0
        } else {
            self.total_length as f64 / self.lengths.len() as f64
        }
    }

    /// Emits a stable (id-ordered) array of `{docId, length}` entries.
    pub fn snapshot(&self) -> Vec<DocLengthEntry> {
        let mut entries: Vec<DocLengthEntry> = self
            .lengths
            .iter()
            .map(|(doc_id, length)| DocLengthEntry {
                doc_id: doc_id.clone(),
                length: *length,
            })
            .collect();
        entries.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
        entries
    }

    /// Replaces the whole state from a snapshot.
    pub fn load(&mut self, entries: Vec<DocLengthEntry>) {
        self.lengths.clear();
        self.total_length = 0;
        for entry in entries {
            self.add_document(&entry.doc_id, entry.length);
        }
    }
}
