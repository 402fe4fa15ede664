use std::collections::HashMap;

use crate::analysis::pipeline::{PipelineContext, PipelineStage};
use crate::analysis::token::Token;
use crate::core::error::Result;
use crate::core::types::TokenMetadata;

/// Per-field edge n-gram override. When a field config map is present, only
/// fields listed with `enabled = true` produce grams.
#[derive(Debug, Clone)]
pub struct FieldNGramConfig {
    pub enabled: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// Expands each token into its edge n-grams (prefixes).
///
/// Tokens shorter than the minimum gram pass through unchanged and gain no
/// metadata. Expanded tokens carry `{is_prefix, original_term}`; the
/// full-length token is emitted exactly once with `is_prefix = false`, even
/// when it is longer than the maximum gram, so the exact term stays
/// queryable.
pub struct EdgeNGramStage {
    enabled: bool,
    min_gram: usize,
    max_gram: usize,
    field_config: Option<HashMap<String, FieldNGramConfig>>,
}

impl EdgeNGramStage {
    pub fn new(
        enabled: bool,
        min_gram: usize,
        max_gram: usize,
        field_config: Option<HashMap<String, FieldNGramConfig>>,
    ) -> Self {
        EdgeNGramStage {
            enabled,
            min_gram: min_gram.max(1),
            max_gram: max_gram.max(min_gram.max(1)),
            field_config,
        }
    }

    fn grams_for(&self, field: &str) -> Option<(usize, usize)> {
        match &self.field_config {
            Some(map) => {
                let config = map.get(field).filter(|c| c.enabled)?;
                let min = config.min_length.unwrap_or(self.min_gram).max(1);
                let max = config.max_length.unwrap_or(self.max_gram).max(min);
                Some((min, max))
            }
            None if self.enabled => Some((self.min_gram, self.max_gram)),
            None => None,
        }
    }
}

impl PipelineStage for EdgeNGramStage {
    fn apply(&self, tokens: Vec<Token>, ctx: &PipelineContext) -> Result<Vec<Token>> {
        let Some((min_gram, max_gram)) = self.grams_for(&ctx.field) else {
            return Ok(tokens);
        };

        let mut out = Vec::new();
        for token in tokens {
            let chars: Vec<char> = token.value.chars().collect();
            if chars.len() < min_gram {
                out.push(token);
                continue;
            }

            let full = token.value.clone();
            for n in min_gram..=max_gram.min(chars.len()) {
                let prefix: String = chars[..n].iter().collect();
                let mut gram = token.rewritten(prefix);
                gram.metadata = Some(TokenMetadata::prefix(n != chars.len(), &full));
                out.push(gram);
            }
            if chars.len() > max_gram {
                let mut exact = token.rewritten(full.clone());
                exact.metadata = Some(TokenMetadata::prefix(false, &full));
                out.push(exact);
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "edge_ngram"
    }
}
