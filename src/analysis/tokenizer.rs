use regex::Regex;

use crate::analysis::pipeline::{PipelineContext, PipelineStage};
use crate::analysis::token::Token;
use crate::core::error::{Error, ErrorKind, Result};

/// Splits raw text into Unicode alphanumeric runs.
///
/// The stage expects exactly one seed token carrying the raw field text;
/// anything else is a programmer error. Each emitted token records the byte
/// offset of its match as the position.
pub struct TokenizeStage {
    word: Regex,
}

impl TokenizeStage {
    pub fn new() -> Result<Self> {
        let word = Regex::new(r"[\p{L}\p{N}]+")
            .map_err(|e| Error::new(ErrorKind::InputRejected, e.to_string()))?;
        Ok(TokenizeStage { word })
    }
}

impl PipelineStage for TokenizeStage {
    fn apply(&self, tokens: Vec<Token>, ctx: &PipelineContext) -> Result<Vec<Token>> {
        if tokens.len() != 1 {
            return Err(Error::new(
                ErrorKind::InvalidPipelineInput,
                format!("tokenize expects one seed token, got {}", tokens.len()),
            ));
        }

        let seed = &tokens[0];
        let mut out = Vec::new();
        for m in self.word.find_iter(&seed.value) {
            out.push(
                Token::new(m.as_str(), m.start(), ctx.field.as_str())
                    .with_document(ctx.document_id.clone()),
            );
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "tokenize"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pipeline::PipelineContext;

    fn ctx() -> PipelineContext {
        PipelineContext {
            field: "title".to_string(),
            document_id: None,
        }
    }

    #[test]
    fn splits_alphanumeric_runs_with_byte_offsets() {
        let stage = TokenizeStage::new().unwrap();
        let seed = vec![Token::new("Quick brown fox-42", 0, "title")];
        let tokens = stage.apply(seed, &ctx()).unwrap();

        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["Quick", "brown", "fox", "42"]);
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 6, 12, 16]);
        assert!(tokens.iter().all(|t| t.field == "title"));
    }

    #[test]
    fn unicode_words_are_kept() {
        let stage = TokenizeStage::new().unwrap();
        let seed = vec![Token::new("café Δδ 東京", 0, "title")];
        let tokens = stage.apply(seed, &ctx()).unwrap();
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["café", "Δδ", "東京"]);
    }

    #[test]
    fn rejects_multiple_seed_tokens() {
        let stage = TokenizeStage::new().unwrap();
        let seeds = vec![Token::new("a", 0, "title"), Token::new("b", 1, "title")];
        let err = stage.apply(seeds, &ctx()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPipelineInput);
    }

    #[test]
    fn rejects_empty_input() {
        let stage = TokenizeStage::new().unwrap();
        let err = stage.apply(Vec::new(), &ctx()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPipelineInput);
    }
}
