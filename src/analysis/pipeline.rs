use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::analysis::filters::edge_ngram::{EdgeNGramStage, FieldNGramConfig};
use crate::analysis::filters::lowercase::LowercaseStage;
use crate::analysis::filters::stemmer::{EnglishStemmer, IdentityStemmer, StemStage, Stemmer};
use crate::analysis::filters::stopword::StopWordStage;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::TokenizeStage;
use crate::core::error::Result;
use crate::core::types::DocId;

/// Context threaded through every stage of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub field: String,
    pub document_id: Option<DocId>,
}

/// One stage of the analysis pipeline. Stages receive the full token list
/// and return a new one; a stage returning no tokens short-circuits the rest
/// of the pipeline.
pub trait PipelineStage: Send + Sync {
    fn apply(&self, tokens: Vec<Token>, ctx: &PipelineContext) -> Result<Vec<Token>>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
}

impl Language {
    /// Parses a language tag; unknown tags fall back to English.
    pub fn parse(tag: &str) -> Language {
        match tag.to_ascii_lowercase().as_str() {
            "en" | "english" => Language::English,
            "es" | "spanish" => Language::Spanish,
            "fr" | "french" => Language::French,
            _ => Language::English,
        }
    }

    fn stop_words(&self) -> StopWordStage {
        match self {
            Language::English => StopWordStage::english(),
            Language::Spanish => StopWordStage::spanish(),
            Language::French => StopWordStage::french(),
        }
    }

    fn stemmer(&self) -> Arc<dyn Stemmer> {
        match self {
            Language::English => Arc::new(EnglishStemmer),
            Language::Spanish | Language::French => Arc::new(IdentityStemmer),
        }
    }
}

#[derive(Clone)]
pub struct PipelineConfig {
    pub language: Language,
    /// Explicit stop words replace the language set; `Some(empty)` disables
    /// filtering entirely.
    pub stop_words: Option<HashSet<String>>,
    pub enable_stemming: bool,
    /// Explicit stemmer; replaces the language-derived one.
    pub stemmer: Option<Arc<dyn Stemmer>>,
    pub enable_edge_ngrams: bool,
    pub edge_ngram_min_length: usize,
    /// Raised to `edge_ngram_min_length` when configured lower.
    pub edge_ngram_max_length: usize,
    pub edge_ngram_field_config: Option<HashMap<String, FieldNGramConfig>>,
    /// Appended after the default stages.
    pub custom_stages: Vec<Arc<dyn PipelineStage>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            language: Language::English,
            stop_words: None,
            enable_stemming: false,
            stemmer: None,
            enable_edge_ngrams: false,
            edge_ngram_min_length: 2,
            edge_ngram_max_length: 15,
            edge_ngram_field_config: None,
            custom_stages: Vec::new(),
        }
    }
}

/// Ordered stage sequence: tokenize, lowercase, stop words, optional stem,
/// optional edge n-grams, then custom stages. The query variant omits the
/// edge n-gram stage; n-grams are an index-time expansion.
pub struct Pipeline {
    index_stages: Vec<Arc<dyn PipelineStage>>,
    query_stages: Vec<Arc<dyn PipelineStage>>,
}

impl Pipeline {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut base: Vec<Arc<dyn PipelineStage>> = vec![
            Arc::new(TokenizeStage::new()?),
            Arc::new(LowercaseStage),
        ];

        let stop_words = match &config.stop_words {
            Some(words) => StopWordStage::new(words.clone()),
            None => config.language.stop_words(),
        };
        base.push(Arc::new(stop_words));

        if config.enable_stemming || config.stemmer.is_some() {
            let stemmer = config
                .stemmer
                .clone()
                .unwrap_or_else(|| config.language.stemmer());
            base.push(Arc::new(StemStage::new(stemmer)));
        }

        let mut query_stages = base.clone();
        let mut index_stages = base;

        if config.enable_edge_ngrams || config.edge_ngram_field_config.is_some() {
            index_stages.push(Arc::new(EdgeNGramStage::new(
                config.enable_edge_ngrams,
                config.edge_ngram_min_length,
                config.edge_ngram_max_length,
                config.edge_ngram_field_config.clone(),
            )));
        }

        for stage in &config.custom_stages {
            index_stages.push(stage.clone());
            query_stages.push(stage.clone());
        }

        Ok(Pipeline {
            index_stages,
            query_stages,
        })
    }

    /// Runs the full index-time pipeline over one field's raw text.
    pub fn run(&self, field: &str, text: &str, document_id: Option<&DocId>) -> Result<Vec<Token>> {
        Self::run_stages(&self.index_stages, field, text, document_id)
    }

    /// Runs the query-time variant (no edge n-gram expansion).
    pub fn run_query(&self, field: &str, text: &str) -> Result<Vec<Token>> {
        Self::run_stages(&self.query_stages, field, text, None)
    }

    fn run_stages(
        stages: &[Arc<dyn PipelineStage>],
        field: &str,
        text: &str,
        document_id: Option<&DocId>,
    ) -> Result<Vec<Token>> {
        let ctx = PipelineContext {
            field: field.to_string(),
            document_id: document_id.cloned(),
        };
        let mut tokens =
            vec![Token::new(text, 0, field).with_document(ctx.document_id.clone())];

        for stage in stages {
            tokens = stage.apply(tokens, &ctx)?;
            if tokens.is_empty() {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_pipeline_tokenizes_lowercases_and_filters() {
        let pipeline = Pipeline::from_config(&PipelineConfig::default()).unwrap();
        let tokens = pipeline.run("body", "Jumps over the LAZY dog", None).unwrap();
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["jumps", "over", "lazy", "dog"]);
    }

    #[test]
    fn explicit_empty_stop_words_disable_filtering() {
        let config = PipelineConfig {
            stop_words: Some(HashSet::new()),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::from_config(&config).unwrap();
        let tokens = pipeline.run("body", "the dog", None).unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn stemming_uses_language_derived_stemmer() {
        let config = PipelineConfig {
            enable_stemming: true,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::from_config(&config).unwrap();
        let tokens = pipeline.run("body", "running dogs", None).unwrap();
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["run", "dog"]);
    }

    #[test]
    fn spanish_stemming_is_a_pass_through() {
        let config = PipelineConfig {
            language: Language::Spanish,
            enable_stemming: true,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::from_config(&config).unwrap();
        let tokens = pipeline.run("body", "corriendo perros", None).unwrap();
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["corriendo", "perros"]);
    }

    #[test]
    fn query_variant_skips_edge_ngrams() {
        let config = PipelineConfig {
            enable_edge_ngrams: true,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::from_config(&config).unwrap();

        let indexed = pipeline.run("title", "fox", None).unwrap();
        assert!(indexed.len() > 1);

        let queried = pipeline.run_query("title", "fox").unwrap();
        assert_eq!(queried.len(), 1);
        assert_eq!(queried[0].value, "fox");
    }

    #[test]
    fn unknown_language_tag_falls_back_to_english() {
        assert_eq!(Language::parse("de"), Language::English);
        assert_eq!(Language::parse("ES"), Language::Spanish);
        assert_eq!(Language::parse("french"), Language::French);
    }

    #[test]
    fn stop_word_only_text_short_circuits_to_empty() {
        let pipeline = Pipeline::from_config(&PipelineConfig::default()).unwrap();
        let tokens = pipeline.run("body", "the of and", None).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn rerunning_normalized_output_preserves_terms() {
        // With stop words and stemming disabled the pipeline is idempotent
        // on its own output.
        let config = PipelineConfig {
            stop_words: Some(HashSet::new()),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::from_config(&config).unwrap();

        let first = pipeline.run("body", "Quick brown the Fox", None).unwrap();
        let joined = first
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let second = pipeline.run("body", &joined, None).unwrap();

        let a: HashSet<String> = first.into_iter().map(|t| t.value).collect();
        let b: HashSet<String> = second.into_iter().map(|t| t.value).collect();
        assert_eq!(a, b);
    }
}
