use std::collections::HashSet;

use serde_json::Value;

use crate::analysis::pipeline::Pipeline;
use crate::core::error::Result;
use crate::core::types::{DocId, TermPosting, TokenMetadata};
use crate::index::vocabulary::Vocabulary;
use crate::search::fuzzy::FuzzyExpander;

/// Boost carried by terms added through fuzzy expansion; the exact query
/// term keeps 1.0.
pub const FUZZY_EXPANSION_BOOST: f64 = 0.8;

pub const DEFAULT_LIMIT: usize = 10;
const DEFAULT_FUZZY_DISTANCE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Exact,
    Prefix,
    Fuzzy,
    Auto,
}

/// The `fuzzy` search option: a plain switch (true means distance 2) or an
/// explicit distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    Enabled(bool),
    Distance(u8),
}

impl Fuzziness {
    pub fn distance(&self) -> Option<u8> {
        match self {
            Fuzziness::Enabled(true) => Some(DEFAULT_FUZZY_DISTANCE),
            Fuzziness::Enabled(false) => None,
            Fuzziness::Distance(d) => Some(*d),
        }
    }
}

#[derive(Default, Clone)]
pub struct SearchOptions {
    /// Fields to search; defaults to the engine's configured fields.
    pub fields: Option<Vec<String>>,
    /// Result count cap, clamped to at least 1. Defaults to 10.
    pub limit: Option<usize>,
    pub fuzzy: Option<Fuzziness>,
    pub mode: Option<SearchMode>,
    /// Drops documents scoring below this before truncation.
    pub min_score: Option<f64>,
    /// Runs the query through the full index-time pipeline, edge n-grams
    /// included. Off by default; n-grams are an index-time expansion.
    pub apply_query_ngrams: bool,
}

/// One `(field, term)` the scorer will fetch postings for.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryToken {
    pub field: String,
    pub term: String,
    pub boost: f64,
}

/// Resolves the effective mode. An explicit non-auto mode wins; auto picks
/// by trimmed query length: up to 3 chars prefix, 8 or more fuzzy,
/// otherwise exact.
pub fn determine_search_mode(query: &str, mode: Option<SearchMode>) -> SearchMode {
    match mode {
        Some(mode) if mode != SearchMode::Auto => mode,
        _ => {
            let len = query.trim().chars().count();
            if len <= 3 {
                SearchMode::Prefix
            } else if len >= 8 {
                SearchMode::Fuzzy
            } else {
                SearchMode::Exact
            }
        }
    }
}

/// The active fuzzy distance, if any. An explicit `fuzzy` option wins;
/// fuzzy mode without one defaults to distance 2.
pub fn resolve_fuzzy_distance(mode: SearchMode, fuzzy: Option<Fuzziness>) -> Option<u8> {
    match fuzzy {
        Some(option) => option.distance(),
        None if mode == SearchMode::Fuzzy => Some(DEFAULT_FUZZY_DISTANCE),
        None => None,
    }
}

/// Tokenizes the query per field, deduplicates `(field, term)` pairs, and
/// appends fuzzy expansions from the vocabulary at a reduced boost.
pub fn build_query_tokens(
    pipeline: &Pipeline,
    fields: &[String],
    query: &str,
    apply_query_ngrams: bool,
    fuzzy_distance: Option<u8>,
    expander: &mut FuzzyExpander,
    vocabulary: &Vocabulary,
) -> Result<Vec<QueryToken>> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut tokens = Vec::new();

    for field in fields {
        let analyzed = if apply_query_ngrams {
            pipeline.run(field, query, None)?
        } else {
            pipeline.run_query(field, query)?
        };
        for token in analyzed {
            if seen.insert((field.clone(), token.value.clone())) {
                tokens.push(QueryToken {
                    field: field.clone(),
                    term: token.value,
                    boost: 1.0,
                });
            }
        }
    }

    if let Some(distance) = fuzzy_distance {
        let mut expanded = Vec::new();
        for token in &tokens {
            for candidate in expander.expand(&token.term, distance, vocabulary) {
                if seen.insert((token.field.clone(), candidate.clone())) {
                    expanded.push(QueryToken {
                        field: token.field.clone(),
                        term: candidate,
                        boost: FUZZY_EXPANSION_BOOST,
                    });
                }
            }
        }
        tokens.extend(expanded);
    }

    Ok(tokens)
}

/// Parses one decoded payload entry into a posting.
///
/// String entries are JSON-parsed: an object carrying a `docId` becomes a
/// full posting (frequency defaults to 1 unless positive and finite); any
/// other string is a raw identifier with frequency 1. Raw numbers are
/// integer identifiers with frequency 1.
pub fn posting_from_value(value: Value) -> Option<TermPosting> {
    match value {
        Value::Number(n) => n.as_u64().map(|id| TermPosting {
            doc_id: DocId::Integer(id),
            term_frequency: 1.0,
            metadata: None,
        }),
        Value::Object(map) => posting_from_object(&map),
        Value::String(s) => {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&s) {
                if let Some(posting) = posting_from_object(&map) {
                    return Some(posting);
                }
            }
            Some(TermPosting {
                doc_id: DocId::Text(s),
                term_frequency: 1.0,
                metadata: None,
            })
        }
        _ => None,
    }
}

fn posting_from_object(map: &serde_json::Map<String, Value>) -> Option<TermPosting> {
    let doc_id = match map.get("docId")? {
        Value::Number(n) => DocId::Integer(n.as_u64()?),
        Value::String(s) => DocId::Text(s.clone()),
        _ => return None,
    };
    let term_frequency = map
        .get("termFrequency")
        .and_then(Value::as_f64)
        .filter(|f| f.is_finite() && *f > 0.0)
        .unwrap_or(1.0);
    let metadata = map
        .get("metadata")
        .and_then(|m| serde_json::from_value::<TokenMetadata>(m.clone()).ok());
    Some(TermPosting {
        doc_id,
        term_frequency,
        metadata,
    })
}
