use serde::{Deserialize, Serialize};

use crate::extract::ExtractedPage;

/// A fixed-size, page-tagged slice of document text. Never mutated after
/// creation; the page number keeps citations exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub page: u32,
}

impl Passage {
    /// The passage text prefixed with its page tag, as it appears in
    /// grounding prompts.
    pub fn tagged(&self) -> String {
        format!("[page {}] {}", self.page, self.text)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub window: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            window: 1200,
            overlap: 150,
        }
    }
}

pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Chunk each page independently so windows never cross a page boundary.
    pub fn build(&self, pages: &[ExtractedPage]) -> Vec<Passage> {
        let mut passages = Vec::new();
        for page in pages {
            for text in self.chunk_text(&page.text) {
                passages.push(Passage {
                    text,
                    page: page.page,
                });
            }
        }
        tracing::debug!(pages = pages.len(), passages = passages.len(), "chunked document");
        passages
    }

    /// Slide a fixed character window with fixed overlap across
    /// whitespace-collapsed text. Empty or whitespace-only input yields
    /// nothing.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let window = self.config.window.max(1);
        let overlap = self.config.overlap.min(window.saturating_sub(1));
        let collapsed: Vec<char> = collapse_whitespace(text);
        if collapsed.is_empty() {
            return Vec::new();
        }
        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + window).min(collapsed.len());
            chunks.push(collapsed[start..end].iter().collect());
            if end == collapsed.len() {
                break;
            }
            start = end - overlap;
        }
        chunks
    }
}

fn collapse_whitespace(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars());
    }
    out
}
