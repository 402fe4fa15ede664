use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::pipeline::Pipeline;
use crate::analysis::token::Token;
use crate::core::error::Result;
use crate::core::types::{DocId, TokenMetadata};
use crate::index::accumulator::DocumentAccumulator;

/// Caller-facing document: an id, text fields to index, and an optional
/// stored payload that is persisted but never indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub id: DocId,
    pub fields: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub store: Option<serde_json::Value>,
}

impl DocumentInput {
    pub fn new(id: impl Into<DocId>, fields: HashMap<String, String>) -> Self {
        DocumentInput {
            id: id.into(),
            fields,
            store: None,
        }
    }
}

/// Pipeline output for one document, ready for posting upserts.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub doc_id: DocId,
    pub field_frequencies: HashMap<String, HashMap<String, u32>>,
    pub field_metadata: HashMap<String, HashMap<String, TokenMetadata>>,
    pub field_lengths: HashMap<String, u64>,
    pub total_length: u64,
}

/// Runs the analysis pipeline over a document's fields and accumulates the
/// result.
pub struct Indexer {
    pipeline: Arc<Pipeline>,
}

impl Indexer {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Indexer { pipeline }
    }

    pub fn ingest(&self, record: &DocumentInput) -> Result<IngestedDocument> {
        let mut accumulator = DocumentAccumulator::new();
        for (field, text) in &record.fields {
            if text.is_empty() {
                continue;
            }
            let tokens = self.pipeline.run(field, text, Some(&record.id))?;
            for token in &tokens {
                accumulator.add_token(token);
            }
        }
        Ok(Self::finish(record.id.clone(), accumulator))
    }

    /// Batch ingestion with token caching: each distinct `(field, raw text)`
    /// pair is tokenized once and reused across the batch. Valid because
    /// tokenization is deterministic for a given text.
    pub fn ingest_batch(&self, records: &[DocumentInput]) -> Result<Vec<IngestedDocument>> {
        let mut token_cache: HashMap<(String, String), Vec<Token>> = HashMap::new();
        let mut out = Vec::with_capacity(records.len());

        for record in records {
            let mut accumulator = DocumentAccumulator::new();
            for (field, text) in &record.fields {
                if text.is_empty() {
                    continue;
                }
                let key = (field.clone(), text.clone());
                if !token_cache.contains_key(&key) {
                    let tokens = self.pipeline.run(field, text, None)?;
                    token_cache.insert(key.clone(), tokens);
                }
                for token in &token_cache[&key] {
                    accumulator.add_token(token);
                }
            }
            out.push(Self::finish(record.id.clone(), accumulator));
        }
        Ok(out)
    }

    fn finish(doc_id: DocId, accumulator: DocumentAccumulator) -> IngestedDocument {
        let mut field_frequencies = HashMap::new();
        let mut field_metadata = HashMap::new();
        let mut field_lengths = HashMap::new();
        let mut total_length = 0;

        for (field, acc) in accumulator.into_fields() {
            total_length += acc.length;
            field_lengths.insert(field.clone(), acc.length);
            field_metadata.insert(field.clone(), acc.term_metadata);
            field_frequencies.insert(field, acc.term_frequencies);
        }

        IngestedDocument {
            doc_id,
            field_frequencies,
            field_metadata,
            field_lengths,
            total_length,
        }
    }
}
