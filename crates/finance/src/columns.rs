use crate::datetime::parse_datetime;
use crate::money::looks_like_amount;

const DATE_HINTS: &[&str] = &["date", "time", "datetime", "timestamp", "posted"];
const AMOUNT_HINTS: &[&str] = &[
    "amount", "amt", "value", "total", "debit", "credit", "payment", "balance",
];
const CATEGORY_HINTS: &[&str] = &[
    "category",
    "type",
    "merchant",
    "description",
    "desc",
    "account",
];

/// Strictly-more-than-half of sampled non-empty cells must satisfy the
/// statistical test for a column to win a role without a header hint.
const MAJORITY: f64 = 0.5;

/// Functional meaning assigned to table columns, by index into the header.
/// `amount` is the gating role: without it there is no financial dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRoles {
    pub datetime: Option<usize>,
    pub amount: Option<usize>,
    pub category: Option<usize>,
}

/// Two-stage role detection: header-name hints first, then a statistical
/// fallback over the body cells.
pub fn detect_roles(header: &[String], body: &[Vec<String>]) -> ColumnRoles {
    let datetime = hinted_column(header, DATE_HINTS)
        .or_else(|| majority_column(header, body, &[], |cell| parse_datetime(cell).is_some()));

    let exclude_dt: Vec<usize> = datetime.into_iter().collect();
    let amount = hinted_column_excluding(header, AMOUNT_HINTS, &exclude_dt)
        .or_else(|| majority_column(header, body, &exclude_dt, looks_like_amount));

    let mut taken = exclude_dt.clone();
    taken.extend(amount);
    let category = hinted_column_excluding(header, CATEGORY_HINTS, &taken)
        .or_else(|| text_column(header, body, &taken));

    ColumnRoles {
        datetime,
        amount,
        category,
    }
}

fn normalize_header(cell: &str) -> String {
    cell.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn hinted_column(header: &[String], hints: &[&str]) -> Option<usize> {
    hinted_column_excluding(header, hints, &[])
}

fn hinted_column_excluding(header: &[String], hints: &[&str], exclude: &[usize]) -> Option<usize> {
    let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
    for hint in hints {
        for (idx, name) in normalized.iter().enumerate() {
            if !exclude.contains(&idx) && name.contains(hint) {
                return Some(idx);
            }
        }
    }
    None
}

/// Best column where a strict majority of non-empty cells pass `test`.
fn majority_column<F>(
    header: &[String],
    body: &[Vec<String>],
    exclude: &[usize],
    test: F,
) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    let mut best: Option<(usize, f64)> = None;
    for idx in 0..header.len() {
        if exclude.contains(&idx) {
            continue;
        }
        let mut hits = 0usize;
        let mut total = 0usize;
        for row in body {
            let Some(cell) = row.get(idx) else { continue };
            if cell.trim().is_empty() {
                continue;
            }
            total += 1;
            if test(cell) {
                hits += 1;
            }
        }
        if total == 0 {
            continue;
        }
        let rate = hits as f64 / total as f64;
        if rate > MAJORITY && best.map_or(true, |(_, r)| rate > r) {
            best = Some((idx, rate));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Category fallback: a textual column with moderate cardinality, the shape
/// a category/merchant column usually has.
fn text_column(header: &[String], body: &[Vec<String>], exclude: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for idx in 0..header.len() {
        if exclude.contains(&idx) {
            continue;
        }
        let values: Vec<&str> = body
            .iter()
            .filter_map(|row| row.get(idx))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if values.is_empty() {
            continue;
        }
        let textual = values
            .iter()
            .filter(|v| !looks_like_amount(v) && parse_datetime(v).is_none())
            .count();
        if (textual as f64 / values.len() as f64) <= MAJORITY {
            continue;
        }
        let unique = {
            let mut sorted: Vec<&str> = values.clone();
            sorted.sort_unstable();
            sorted.dedup();
            sorted.len()
        };
        let ratio = unique as f64 / values.len() as f64;
        let score = 1.0 - (ratio - 0.2).abs();
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn header_hints_win() {
        let roles = detect_roles(
            &header(&["Posted Date", "Merchant", "Amount"]),
            &rows(&[&["2024-01-01", "Cafe", "$3.50"]]),
        );
        assert_eq!(roles.datetime, Some(0));
        assert_eq!(roles.amount, Some(2));
        assert_eq!(roles.category, Some(1));
    }

    #[test]
    fn statistical_fallback_detects_roles() {
        let roles = detect_roles(
            &header(&["A", "B", "C"]),
            &rows(&[
                &["2024-01-01", "Groceries", "$10.00"],
                &["2024-01-02", "Rent", "(1,200.00)"],
                &["2024-01-03", "Groceries", "$22.40"],
            ]),
        );
        assert_eq!(roles.datetime, Some(0));
        assert_eq!(roles.amount, Some(2));
        assert_eq!(roles.category, Some(1));
    }

    #[test]
    fn minority_matches_do_not_qualify() {
        let roles = detect_roles(
            &header(&["X", "Y"]),
            &rows(&[
                &["note one", "remark"],
                &["2024-01-02", "remark"],
                &["note three", "remark"],
            ]),
        );
        assert_eq!(roles.datetime, None);
        assert_eq!(roles.amount, None);
    }

    #[test]
    fn amount_without_datetime_is_allowed() {
        let roles = detect_roles(
            &header(&["Item", "Total"]),
            &rows(&[&["pens", "4.20"], &["paper", "7.80"]]),
        );
        assert_eq!(roles.datetime, None);
        assert_eq!(roles.amount, Some(1));
        assert_eq!(roles.category, Some(0));
    }
}
