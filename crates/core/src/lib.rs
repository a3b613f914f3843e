mod chunk;
mod embedding;
mod error;
mod extract;
mod normalization;

pub use chunk::{ChunkConfig, Chunker, Passage};
pub use embedding::{dot, l2_normalize, HashEmbedder, HashEmbedderConfig};
pub use error::{EngineError, Result};
pub use extract::{ExtractedPage, Fingerprint, PageExtractor, RawTable};
pub use normalization::normalize_question;
