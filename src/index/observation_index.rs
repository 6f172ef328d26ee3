//! Inverted index over tokenised observations, plus the document-frequency
//! table ranked search needs for TF-IDF.

use crate::atoms::constants::TOKEN_MIN_LENGTH;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Lowercases, splits on non-alphanumeric boundaries, and drops tokens
/// shorter than [`TOKEN_MIN_LENGTH`].
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= TOKEN_MIN_LENGTH)
        .map(|t| t.to_string())
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct ObservationIndex {
    /// token → entity names containing it.
    postings: HashMap<String, BTreeSet<String>>,
    /// entity name → distinct tokens it contributes, for cheap removal.
    per_entity_tokens: HashMap<String, HashSet<String>>,
    /// token → number of entities whose indexed text contains it.
    document_frequency: HashMap<String, usize>,
    document_count: usize,
}

impl ObservationIndex {
    /// Indexes the given entity's searchable text (name + type + tags +
    /// observations, matching the ranked-search "name+type+tag+observations"
    /// concatenation in SPEC_FULL.md §4.4).
    pub fn index_entity(&mut self, name: &str, text_fields: &[&str]) {
        self.remove_entity(name);

        let mut tokens = HashSet::new();
        for field in text_fields {
            tokens.extend(tokenize(field));
        }

        for token in &tokens {
            self.postings
                .entry(token.clone())
                .or_default()
                .insert(name.to_string());
            *self.document_frequency.entry(token.clone()).or_insert(0) += 1;
        }

        self.per_entity_tokens.insert(name.to_string(), tokens);
        self.document_count += 1;
    }

    pub fn remove_entity(&mut self, name: &str) {
        if let Some(tokens) = self.per_entity_tokens.remove(name) {
            for token in tokens {
                if let Some(set) = self.postings.get_mut(&token) {
                    set.remove(name);
                    if set.is_empty() {
                        self.postings.remove(&token);
                    }
                }
                if let Some(df) = self.document_frequency.get_mut(&token) {
                    *df = df.saturating_sub(1);
                    if *df == 0 {
                        self.document_frequency.remove(&token);
                    }
                }
            }
            self.document_count = self.document_count.saturating_sub(1);
        }
    }

    pub fn postings_for(&self, token: &str) -> BTreeSet<String> {
        self.postings.get(token).cloned().unwrap_or_default()
    }

    pub fn contains_token(&self, name: &str, token: &str) -> bool {
        self.per_entity_tokens
            .get(name)
            .map(|tokens| tokens.contains(token))
            .unwrap_or(false)
    }

    pub fn document_frequency(&self, token: &str) -> usize {
        self.document_frequency.get(token).copied().unwrap_or(0)
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// `idf = log((N+1)/(df+1)) + 1`, per SPEC_FULL.md §4.4.
    pub fn idf(&self, token: &str) -> f64 {
        let n = self.document_count() as f64;
        let df = self.document_frequency(token) as f64;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.per_entity_tokens.clear();
        self.document_frequency.clear();
        self.document_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_short_tokens_and_lowercases() {
        let tokens = tokenize("Loves-Pasta a lot!");
        assert_eq!(tokens, vec!["loves", "pasta", "lot"]);
    }

    #[test]
    fn index_and_remove_round_trip() {
        let mut idx = ObservationIndex::default();
        idx.index_entity("A", &["person", "loves pasta"]);
        assert!(idx.postings_for("pasta").contains("A"));
        assert_eq!(idx.document_frequency("pasta"), 1);

        idx.remove_entity("A");
        assert!(idx.postings_for("pasta").is_empty());
        assert_eq!(idx.document_frequency("pasta"), 0);
        assert_eq!(idx.document_count(), 0);
    }
}
