use serde::{Deserialize, Serialize};

use crate::core::stats::DocLengthEntry;
use crate::core::types::{DocId, TokenMetadata};

/// One posting inside an internal snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub doc_id: DocId,
    pub term_frequency: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<TokenMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPosting {
    pub field: String,
    pub term: String,
    pub documents: Vec<SnapshotDocument>,
}

/// Full-fidelity snapshot of the engine's indexed state. Importing one
/// replaces postings, stats and (when present) the vocabulary, then
/// persists so the imported state is durable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub postings: Vec<SnapshotPosting>,
    pub stats: Vec<DocLengthEntry>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vocabulary: Option<Vec<String>>,
}

/// Flattened posting for thread handoff: parallel id/frequency arrays, safe
/// to structured-clone across a worker boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPosting {
    pub field: String,
    pub term: String,
    pub doc_ids: Vec<DocId>,
    pub term_frequencies: Vec<f64>,
}

/// Transport-safe snapshot. Deliberately lossy: per-posting metadata
/// (`isPrefix`/`originalTerm`) is not carried, so prefix-penalty scoring
/// differences vanish after a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSnapshot {
    pub postings: Vec<WorkerPosting>,
    pub stats: Vec<DocLengthEntry>,
}
