//! The vector store abstraction (C5): add/remove/has/get/clear plus
//! top-k cosine-similarity search. The in-memory implementation is the
//! crate's default; other backends can implement the same trait.

use parking_lot::RwLock;
use std::collections::HashMap;

pub trait VectorStore: Send + Sync {
    fn add(&self, name: &str, vector: Vec<f32>);
    fn remove(&self, name: &str);
    fn has(&self, name: &str) -> bool;
    fn get(&self, name: &str) -> Option<Vec<f32>>;
    fn clear(&self);
    /// Top-`k` entity names by cosine similarity, descending.
    fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[derive(Default)]
pub struct InMemoryVectorStore {
    vectors: RwLock<HashMap<String, Vec<f32>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn add(&self, name: &str, vector: Vec<f32>) {
        self.vectors.write().insert(name.to_string(), vector);
    }

    fn remove(&self, name: &str) {
        self.vectors.write().remove(name);
    }

    fn has(&self, name: &str) -> bool {
        self.vectors.read().contains_key(name)
    }

    fn get(&self, name: &str) -> Option<Vec<f32>> {
        self.vectors.read().get(name).cloned()
    }

    fn clear(&self) {
        self.vectors.write().clear();
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let vectors = self.vectors.read();
        let mut scored: Vec<(String, f32)> = vectors
            .iter()
            .map(|(name, vec)| (name.clone(), cosine_similarity(query, vec)))
            .collect();
        scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        self.vectors.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_returns_top_k_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.add("a", vec![1.0, 0.0]);
        store.add("b", vec![0.0, 1.0]);
        store.add("c", vec![0.9, 0.1]);

        let results = store.search(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "a");
    }
}
