use std::collections::HashSet;

use crate::analysis::pipeline::{PipelineContext, PipelineStage};
use crate::analysis::token::Token;
use crate::core::error::Result;

/// Drops tokens whose value is in the configured set. An empty set is a
/// no-op.
pub struct StopWordStage {
    pub stop_words: HashSet<String>,
}

impl StopWordStage {
    pub fn new(stop_words: HashSet<String>) -> Self {
        StopWordStage { stop_words }
    }

    pub fn english() -> Self {
        // Deliberately short, and without two-letter articles so prefix
        // queries like "an" keep working against edge n-gram indexes.
        StopWordStage::new(word_set(&[
            "a", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
            "it", "its", "of", "on", "that", "the", "to", "was", "will", "with",
        ]))
    }

    pub fn spanish() -> Self {
        StopWordStage::new(word_set(&[
            "de", "la", "que", "el", "en", "y", "a", "los", "del", "se", "las", "por", "un",
            "para", "con", "no", "una", "su", "al", "lo", "como", "más", "pero", "sus",
        ]))
    }

    pub fn french() -> Self {
        StopWordStage::new(word_set(&[
            "le", "la", "les", "de", "des", "du", "un", "une", "et", "en", "au", "aux", "que",
            "qui", "dans", "pour", "sur", "pas", "plus", "par", "avec", "ce", "ne", "se",
        ]))
    }
}

fn word_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl PipelineStage for StopWordStage {
    fn apply(&self, tokens: Vec<Token>, _ctx: &PipelineContext) -> Result<Vec<Token>> {
        if self.stop_words.is_empty() {
            return Ok(tokens);
        }
        Ok(tokens
            .into_iter()
            .filter(|token| !self.stop_words.contains(&token.value))
            .collect())
    }

    fn name(&self) -> &str {
        "stop_words"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PipelineContext {
        PipelineContext {
            field: "body".to_string(),
            document_id: None,
        }
    }

    fn tokens(values: &[&str]) -> Vec<Token> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Token::new(*v, i, "body"))
            .collect()
    }

    #[test]
    fn english_list_drops_articles() {
        let stage = StopWordStage::english();
        let out = stage
            .apply(tokens(&["jumps", "over", "the", "lazy", "dog"]), &ctx())
            .unwrap();
        let values: Vec<&str> = out.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["jumps", "over", "lazy", "dog"]);
    }

    #[test]
    fn empty_set_is_a_no_op() {
        let stage = StopWordStage::new(HashSet::new());
        let out = stage.apply(tokens(&["the", "a"]), &ctx()).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn language_lists_differ() {
        assert!(StopWordStage::spanish().stop_words.contains("que"));
        assert!(StopWordStage::french().stop_words.contains("avec"));
        assert!(!StopWordStage::english().stop_words.contains("avec"));
    }
}
