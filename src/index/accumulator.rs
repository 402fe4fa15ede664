use std::collections::HashMap;

use crate::analysis::token::Token;
use crate::core::types::TokenMetadata;

/// Per-field accumulation of one document's tokens.
#[derive(Debug, Default, Clone)]
pub struct FieldAccumulation {
    pub term_frequencies: HashMap<String, u32>,
    pub term_metadata: HashMap<String, TokenMetadata>,
    pub length: u64,
}

/// Collects pipeline output for a single document into per-field term
/// frequencies and metadata. The first non-null metadata seen for a term
/// wins; later metadata for the same term is ignored.
#[derive(Debug, Default)]
pub struct DocumentAccumulator {
    fields: HashMap<String, FieldAccumulation>,
}

impl DocumentAccumulator {
    pub fn new() -> Self {
        DocumentAccumulator::default()
    }

    pub fn add_token(&mut self, token: &Token) {
        if token.value.is_empty() {
            return;
        }
        let field = self.fields.entry(token.field.clone()).or_default();
        *field
            .term_frequencies
            .entry(token.value.clone())
            .or_insert(0) += 1;
        field.length += 1;
        if let Some(metadata) = &token.metadata {
            field
                .term_metadata
                .entry(token.value.clone())
                .or_insert_with(|| metadata.clone());
        }
    }

    pub fn total_length(&self) -> u64 {
        self.fields.values().map(|f| f.length).sum()
    }

    pub fn into_fields(self) -> HashMap<String, FieldAccumulation> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_frequencies_per_field() {
        let mut acc = DocumentAccumulator::new();
        acc.add_token(&Token::new("fox", 0, "title"));
        acc.add_token(&Token::new("fox", 4, "title"));
        acc.add_token(&Token::new("fox", 0, "body"));

        let fields = acc.into_fields();
        assert_eq!(fields["title"].term_frequencies["fox"], 2);
        assert_eq!(fields["title"].length, 2);
        assert_eq!(fields["body"].term_frequencies["fox"], 1);
    }

    #[test]
    fn first_metadata_wins() {
        let mut acc = DocumentAccumulator::new();
        let mut first = Token::new("an", 0, "title");
        first.metadata = Some(TokenMetadata::prefix(true, "anthropic"));
        let mut second = Token::new("an", 0, "title");
        second.metadata = Some(TokenMetadata::prefix(true, "antenna"));

        acc.add_token(&first);
        acc.add_token(&second);

        let fields = acc.into_fields();
        assert_eq!(
            fields["title"].term_metadata["an"].original_term.as_deref(),
            Some("anthropic")
        );
        assert_eq!(fields["title"].term_frequencies["an"], 2);
    }

    #[test]
    fn empty_tokens_are_dropped() {
        let mut acc = DocumentAccumulator::new();
        acc.add_token(&Token::new("", 0, "title"));
        assert_eq!(acc.total_length(), 0);
        assert!(acc.into_fields().is_empty());
    }
}
