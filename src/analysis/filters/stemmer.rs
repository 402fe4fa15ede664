use std::sync::Arc;

use crate::analysis::pipeline::{PipelineContext, PipelineStage};
use crate::analysis::token::Token;
use crate::core::error::Result;

pub trait Stemmer: Send + Sync {
    fn stem(&self, value: &str) -> String;

    fn name(&self) -> &str;
}

/// Narrow English suffix stripper: `-ing`, `-ed` and `-s` under length
/// guards, with a doubled-consonant collapse (`runn` → `run`) over a small
/// consonant set. Deliberately not a full Porter stemmer.
pub struct EnglishStemmer;

const DOUBLED_CONSONANTS: &[u8] = b"bdfglmnprst";

impl Stemmer for EnglishStemmer {
    fn stem(&self, value: &str) -> String {
        if !value.is_ascii() {
            return value.to_string();
        }

        if value.len() > 5 {
            if let Some(stem) = value.strip_suffix("ing") {
                return collapse_doubled(stem);
            }
        }
        if value.len() > 4 {
            if let Some(stem) = value.strip_suffix("ed") {
                return collapse_doubled(stem);
            }
        }
        if value.len() > 3 && value.ends_with('s') && !value.ends_with("ss") {
            return value[..value.len() - 1].to_string();
        }
        value.to_string()
    }

    fn name(&self) -> &str {
        "english"
    }
}

fn collapse_doubled(stem: &str) -> String {
    let bytes = stem.as_bytes();
    if bytes.len() >= 2 {
        let last = bytes[bytes.len() - 1];
        if last == bytes[bytes.len() - 2] && DOUBLED_CONSONANTS.contains(&last) {
            return stem[..stem.len() - 1].to_string();
        }
    }
    stem.to_string()
}

/// Pass-through stemmer for languages without stemming support.
pub struct IdentityStemmer;

impl Stemmer for IdentityStemmer {
    fn stem(&self, value: &str) -> String {
        value.to_string()
    }

    fn name(&self) -> &str {
        "identity"
    }
}

pub struct StemStage {
    stemmer: Arc<dyn Stemmer>,
}

impl StemStage {
    pub fn new(stemmer: Arc<dyn Stemmer>) -> Self {
        StemStage { stemmer }
    }
}

impl PipelineStage for StemStage {
    fn apply(&self, tokens: Vec<Token>, _ctx: &PipelineContext) -> Result<Vec<Token>> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                let stemmed = self.stemmer.stem(&token.value);
                token.rewritten(stemmed)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "stem"
    }
}
