use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Conservative word-level corrections for frequent misspellings seen in
/// user questions. Keeps user meaning; helps retrieval.
static CORRECTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("wther", "whether"),
        ("wether", "whether"),
        ("finacial", "financial"),
        ("finanicial", "financial"),
        ("summery", "summary"),
        ("sumarize", "summarize"),
        ("summarise", "summarize"),
    ])
});

/// Collapse whitespace and apply the fixed misspelling dictionary.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .map(|token| {
            CORRECTIONS
                .get(token.to_lowercase().as_str())
                .copied()
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_question("  what \t is\n this "), "what is this");
    }

    #[test]
    fn corrects_known_misspellings() {
        assert_eq!(
            normalize_question("sumarize the finacial section"),
            "summarize the financial section"
        );
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(normalize_question("   "), "");
    }
}
