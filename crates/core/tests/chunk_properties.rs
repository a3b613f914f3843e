use docmind_core::{ChunkConfig, Chunker};
use proptest::prelude::*;

proptest! {
    /// Windows are bounded by the configured size and reconstruct the
    /// collapsed input when the overlap regions are dropped.
    #[test]
    fn windows_cover_collapsed_text(
        words in proptest::collection::vec("[a-z]{1,12}", 0..200),
        window in 8usize..64,
        overlap in 0usize..7,
    ) {
        let text = words.join(" ");
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let chunker = Chunker::new(ChunkConfig { window, overlap });
        let chunks = chunker.chunk_text(&text);

        if collapsed.is_empty() {
            prop_assert!(chunks.is_empty());
            return Ok(());
        }

        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert!(chunk.chars().count() <= window);
            if i == 0 {
                rebuilt.push_str(chunk);
            } else {
                let fresh: String = chunk.chars().skip(overlap).collect();
                rebuilt.push_str(&fresh);
            }
        }
        prop_assert_eq!(rebuilt, collapsed);
    }
}
