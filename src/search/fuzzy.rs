use std::collections::{HashMap, VecDeque};

use crate::index::vocabulary::Vocabulary;

const MIN_DISTANCE: u8 = 1;
const MAX_DISTANCE: u8 = 3;
const EXPANSION_CACHE_CAPACITY: usize = 1000;

/// Levenshtein distance, Wagner-Fischer with two rolling rows. Works on
/// chars; O(|a|*|b|) time, O(min(|a|,|b|)) space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    // Keep the row over the shorter string
    let (outer, inner) = if a_chars.len() >= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };

    if inner.is_empty() {
        return outer.len();
    }

    let mut prev_row: Vec<usize> = (0..=inner.len()).collect();
    let mut curr_row = vec![0usize; inner.len() + 1];

    for (i, &outer_char) in outer.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, &inner_char) in inner.iter().enumerate() {
            let cost = if outer_char == inner_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1) // deletion
                .min(curr_row[j] + 1) // insertion
                .min(prev_row[j] + cost); // substitution
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[inner.len()]
}

/// Expands query terms against the vocabulary within a bounded edit
/// distance. Results are cached per `term:distance`; the cache drops its
/// oldest entries past capacity and is wiped wholesale whenever the
/// vocabulary gains a term.
pub struct FuzzyExpander {
    cache: HashMap<String, Vec<String>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for FuzzyExpander {
    fn default() -> Self {
        FuzzyExpander::new()
    }
}

impl FuzzyExpander {
    pub fn new() -> Self {
        FuzzyExpander {
            cache: HashMap::new(),
            order: VecDeque::new(),
            capacity: EXPANSION_CACHE_CAPACITY,
        }
    }

    /// All vocabulary terms within `min(max(distance, 1), 3)` edits of the
    /// (lowercased) term. Entries whose length differs by more than the
    /// capped distance are skipped without computing the distance; returned
    /// terms keep their original casing.
    pub fn expand(&mut self, term: &str, distance: u8, vocabulary: &Vocabulary) -> Vec<String> {
        let capped = distance.clamp(MIN_DISTANCE, MAX_DISTANCE) as usize;
        let key = format!("{}:{}", term, capped);
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let lowered = term.to_lowercase();
        let term_len = lowered.chars().count();
        let mut matches = Vec::new();
        for candidate in vocabulary.iter() {
            let candidate_len = candidate.chars().count();
            if candidate_len.abs_diff(term_len) > capped {
                continue;
            }
            if levenshtein(&lowered, &candidate.to_lowercase()) <= capped {
                matches.push(candidate.clone());
            }
        }

        self.insert(key, matches.clone());
        matches
    }

    /// Drops every cached expansion. Called on any vocabulary mutation.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.order.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn insert(&mut self, key: String, matches: Vec<String>) {
        if self.cache.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        if self.cache.insert(key.clone(), matches).is_none() {
            self.order.push_back(key);
        }
    }
}
