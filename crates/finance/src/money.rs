use once_cell::sync::Lazy;
use regex::Regex;

/// Matches values that look like money: an optional currency symbol followed
/// by digits, or a digit group with thousands separators.
pub static MONEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[$€£]\s*\d|[-+(]?\s*\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+\.\d{2})").expect("money regex")
});

/// Parse a monetary cell into a signed float.
///
/// Currency symbols and thousands separators are stripped; a parenthesized
/// value means negative (accounting notation). Unparsable cells return
/// `None` so the caller can exclude the value from aggregates rather than
/// treating it as zero.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Anything outside money notation (letters, slashes, colons) means this
    // cell is not an amount at all, so a date never slips through as one.
    let allowed = trimmed.chars().all(|c| {
        c.is_ascii_digit() || c.is_whitespace() || matches!(c, '$' | '€' | '£' | ',' | '.' | '(' | ')' | '-' | '+')
    });
    if !allowed {
        return None;
    }
    let negative_parens = trimmed.contains('(') && trimmed.contains(')');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if negative_parens {
        Some(-value.abs())
    } else {
        Some(value)
    }
}

/// Whether a cell looks like money: it must carry money notation (currency
/// symbol, thousands separators, or a decimal fraction) and survive the
/// full parse. Bare integers do not qualify, otherwise serial numbers and
/// chapter indexes would read as amounts.
pub fn looks_like_amount(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    MONEY_RE.is_match(trimmed) && parse_amount(trimmed).is_some()
}
