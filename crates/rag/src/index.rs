use serde::{Deserialize, Serialize};

use docmind_core::{dot, Passage};

/// A read-only search hit: the passage plus its cosine score in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub page: u32,
    pub score: f32,
}

/// Flat in-memory inner-product index over L2-normalized vectors. Built
/// once per document and replaced wholesale on rebuild; no incremental
/// update or deletion.
pub struct MemoryIndex {
    passages: Vec<Passage>,
    vectors: Vec<Vec<f32>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            passages: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Append passages with their pre-normalized vectors, preserving order
    /// for stable tie-breaking at query time.
    pub fn add(&mut self, passages: Vec<Passage>, vectors: Vec<Vec<f32>>) {
        debug_assert_eq!(passages.len(), vectors.len());
        self.passages.extend(passages);
        self.vectors.extend(vectors);
    }

    /// Score every stored vector against the query and return the `top_k`
    /// best, highest first. The sort is stable, so equal scores keep
    /// insertion order; `top_k` is clamped to the stored count.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<RetrievedPassage> {
        let mut hits: Vec<RetrievedPassage> = self
            .passages
            .iter()
            .zip(self.vectors.iter())
            .map(|(passage, vector)| RetrievedPassage {
                text: passage.text.clone(),
                page: passage.page,
                score: dot(query, vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k.min(self.passages.len()));
        hits
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmind_core::{HashEmbedder, HashEmbedderConfig};

    fn build_index(texts: &[&str]) -> (MemoryIndex, HashEmbedder) {
        let embedder = HashEmbedder::new(HashEmbedderConfig::default());
        let passages: Vec<Passage> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Passage {
                text: t.to_string(),
                page: i as u32 + 1,
            })
            .collect();
        let vectors = passages
            .iter()
            .map(|p| embedder.embed_text(&p.text))
            .collect();
        let mut index = MemoryIndex::new();
        index.add(passages, vectors);
        (index, embedder)
    }

    #[test]
    fn exact_match_scores_near_one() {
        let (index, embedder) = build_index(&[
            "total revenue for the quarter",
            "shipping and handling policy",
        ]);
        let hits = index.search(&embedder.embed_text("total revenue for the quarter"), 2);
        assert_eq!(hits[0].page, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-4);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn top_k_is_clamped_to_store_size() {
        let (index, embedder) = build_index(&["alpha", "beta"]);
        let hits = index.search(&embedder.embed_text("alpha"), 10);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn results_are_sorted_best_first() {
        let (index, embedder) = build_index(&["cats and dogs", "dogs", "weather report"]);
        let hits = index.search(&embedder.embed_text("dogs"), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(hits[0].text, "dogs");
    }

    #[test]
    fn ties_keep_insertion_order() {
        let (index, embedder) = build_index(&["same text", "same text"]);
        let hits = index.search(&embedder.embed_text("same text"), 2);
        assert_eq!(hits[0].page, 1);
        assert_eq!(hits[1].page, 2);
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = MemoryIndex::new();
        assert!(index.search(&[0.0; 4], 5).is_empty());
    }
}
