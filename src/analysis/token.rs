use crate::core::types::{DocId, TokenMetadata};

/// A pipeline token. `position` is the byte offset where the token was
/// matched in the source text; `field` and `document_id` are plumbed in from
/// the pipeline context.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: String,
    pub position: usize,
    pub field: String,
    pub document_id: Option<DocId>,
    pub metadata: Option<TokenMetadata>,
}

impl Token {
    pub fn new(value: impl Into<String>, position: usize, field: impl Into<String>) -> Self {
        Token {
            value: value.into(),
            position,
            field: field.into(),
            document_id: None,
            metadata: None,
        }
    }

    pub fn with_document(mut self, document_id: Option<DocId>) -> Self {
        self.document_id = document_id;
        self
    }

    /// Same token with a different value, everything else carried over.
    pub fn rewritten(&self, value: String) -> Self {
        Token {
            value,
            position: self.position,
            field: self.field.clone(),
            document_id: self.document_id.clone(),
            metadata: self.metadata.clone(),
        }
    }
}
