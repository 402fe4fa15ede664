use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document identifier. Persistence, snapshots and hash keys always use the
/// canonical string form (integers stringified), so `Integer(1)` and
/// `Text("1")` name the same document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    Integer(u64),
    Text(String),
}

impl DocId {
    /// Canonical string form used for hashing and persistence keys.
    pub fn key(&self) -> Cow<'_, str> {
        match self {
            DocId::Integer(n) => Cow::Owned(n.to_string()),
            DocId::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

}

impl PartialEq for DocId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DocId::Integer(a), DocId::Integer(b)) => a == b,
            (DocId::Text(a), DocId::Text(b)) => a == b,
            (DocId::Integer(a), DocId::Text(b)) | (DocId::Text(b), DocId::Integer(a)) => {
                *b == a.to_string()
            }
        }
    }
}

impl Eq for DocId {}

impl Hash for DocId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DocId::Integer(n) => write!(f, "{}", n),
            DocId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for DocId {
    fn from(id: u64) -> Self {
        DocId::Integer(id)
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        DocId::Text(id.to_string())
    }
}

impl From<String> for DocId {
    fn from(id: String) -> Self {
        DocId::Text(id)
    }
}

/// Per-token metadata carried from the analysis pipeline into postings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_prefix: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_term: Option<String>,
}

impl TokenMetadata {
    pub fn prefix(is_prefix: bool, original_term: &str) -> Self {
        TokenMetadata {
            is_prefix: Some(is_prefix),
            original_term: Some(original_term.to_string()),
        }
    }

    pub fn is_prefix_match(&self) -> bool {
        self.is_prefix == Some(true)
    }
}

/// One posting: a document plus the term frequency of a single term in a
/// single field. Frequency is a positive finite number; bulk paths may fold a
/// query-time boost into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermPosting {
    pub doc_id: DocId,
    pub term_frequency: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<TokenMetadata>,
}

/// Posting-list payload encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "delta-varint")]
    DeltaVarint,
    #[serde(rename = "json")]
    Json,
}

/// Persisted posting-list chunk for the `terms` store.
/// Key schema keeps `chunk` even though only chunk 0 is written, so future
/// chunking needs no migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermChunkRecord {
    pub field: String,
    pub term: String,
    pub chunk: u32,
    pub payload: Vec<u8>,
    pub encoding: Encoding,
    pub doc_frequency: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inverse_document_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub access_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_accessed_at: Option<i64>,
}

/// Caller-supplied payload in the `documents` store, keyed by canonical doc
/// id. Opaque to the engine, round-tripped as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub doc_id: String,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Named blob in the `cacheState` store (`document-stats`, `vocabulary`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStateRecord {
    pub key: String,
    pub payload: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

/// Schema/version tags in the `metadata` store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Record shape for the reserved `vectors` store. The engine currently
/// writes none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorRecord {
    pub field: String,
    pub doc_id: String,
    pub vector: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn doc_id_equality_is_canonical() {
        assert_eq!(DocId::Integer(42), DocId::Text("42".to_string()));
        assert_ne!(DocId::Integer(42), DocId::Text("042".to_string()));
        assert_eq!(DocId::from("doc-1"), DocId::Text("doc-1".to_string()));
    }

    #[test]
    fn doc_id_hash_agrees_with_equality() {
        let mut set = HashSet::new();
        set.insert(DocId::Integer(7));
        assert!(set.contains(&DocId::Text("7".to_string())));
    }

    #[test]
    fn doc_id_serde_is_untagged() {
        assert_eq!(serde_json::to_string(&DocId::Integer(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&DocId::Text("doc-1".into())).unwrap(),
            "\"doc-1\""
        );
        let parsed: DocId = serde_json::from_str("12").unwrap();
        assert_eq!(parsed, DocId::Integer(12));
    }

    #[test]
    fn posting_round_trips_metadata() {
        let posting = TermPosting {
            doc_id: DocId::from("doc-1"),
            term_frequency: 2.0,
            metadata: Some(TokenMetadata::prefix(true, "anthropic")),
        };
        let json = serde_json::to_string(&posting).unwrap();
        assert!(json.contains("\"isPrefix\":true"));
        assert!(json.contains("\"originalTerm\":\"anthropic\""));
        let back: TermPosting = serde_json::from_str(&json).unwrap();
        assert_eq!(back, posting);
    }

    #[test]
    fn encoding_tags() {
        assert_eq!(
            serde_json::to_string(&Encoding::DeltaVarint).unwrap(),
            "\"delta-varint\""
        );
        assert_eq!(serde_json::to_string(&Encoding::Json).unwrap(), "\"json\"");
    }
}
