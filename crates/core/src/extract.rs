use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// One page of extracted document text, 1-based page numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub page: u32,
    pub text: String,
    #[serde(default)]
    pub tables: Vec<RawTable>,
}

/// A raw table as reported by the extraction collaborator: a grid of cells,
/// first row conventionally the header. Cells may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub page: u32,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    pub fn body(&self) -> &[Vec<String>] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }
}

/// External text-extraction collaborator. Implementations may return empty
/// text and no tables for scanned or malformed pages; callers must cope.
pub trait PageExtractor {
    fn extract(&self, document: &[u8], max_pages: Option<usize>) -> Result<Vec<ExtractedPage>>;
}

/// Content fingerprint of an uploaded document. Covers the raw bytes and the
/// effective page limit, so the same bytes read with a different limit force
/// a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_document(bytes: &[u8], max_pages: Option<usize>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let limit = max_pages.map(|p| p as u64).unwrap_or(u64::MAX);
        hasher.update(limit.to_be_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_changes_with_bytes_and_limit() {
        let a = Fingerprint::of_document(b"statement", Some(50));
        let b = Fingerprint::of_document(b"statement", Some(10));
        let c = Fingerprint::of_document(b"other", Some(50));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, Fingerprint::of_document(b"statement", Some(50)));
    }

    #[test]
    fn raw_table_body_skips_header() {
        let table = RawTable {
            page: 1,
            rows: vec![
                vec!["Date".into(), "Amount".into()],
                vec!["2024-01-05".into(), "100".into()],
            ],
        };
        assert_eq!(table.header().unwrap()[1], "Amount");
        assert_eq!(table.body().len(), 1);
    }
}
