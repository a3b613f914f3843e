use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use docmind_core::RawTable;

use crate::columns::{detect_roles, ColumnRoles};
use crate::datetime::parse_datetime;
use crate::money::parse_amount;

/// A dataset needs at least this many normalized transactions before we
/// claim the document contains financial data.
const MIN_TRANSACTIONS: usize = 2;

/// One table row, cells kept verbatim from extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularRecord {
    pub raw_cells: Vec<String>,
}

/// A row normalized through the detected column roles. Rows whose amount
/// cell failed monetary parsing never become transactions; a failed
/// datetime or empty category only blanks that field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub timestamp: Option<NaiveDateTime>,
    pub amount: f64,
    pub category: Option<String>,
}

/// The best financial table found in a document: verbatim records, the
/// column roles they were read through, and the derived transactions in
/// original row order.
#[derive(Debug, Clone)]
pub struct FinancialDataset {
    pub page: u32,
    pub header: Vec<String>,
    pub records: Vec<TabularRecord>,
    pub datetime_col: Option<usize>,
    pub amount_col: usize,
    pub category_col: Option<usize>,
    transactions: Vec<ParsedTransaction>,
}

impl FinancialDataset {
    pub fn transactions(&self) -> &[ParsedTransaction] {
        &self.transactions
    }

    pub fn has_timestamps(&self) -> bool {
        self.datetime_col.is_some()
    }

    pub fn has_categories(&self) -> bool {
        self.category_col.is_some()
    }
}

/// Heuristic parser over every extracted table. Returns the candidate that
/// normalizes into the most transactions, or `None` when no table has a
/// resolvable amount column, which is a normal outcome and not an error.
pub fn parse_tables(tables: &[RawTable]) -> Option<FinancialDataset> {
    let mut best: Option<FinancialDataset> = None;
    for table in tables {
        let Some(candidate) = parse_table(table) else {
            continue;
        };
        let better = best
            .as_ref()
            .map_or(true, |b| candidate.transactions.len() > b.transactions.len());
        if better {
            best = Some(candidate);
        }
    }
    if let Some(dataset) = &best {
        tracing::info!(
            page = dataset.page,
            rows = dataset.records.len(),
            transactions = dataset.transactions.len(),
            "financial table detected"
        );
    } else {
        tracing::debug!(tables = tables.len(), "no financial table detected");
    }
    best
}

fn parse_table(table: &RawTable) -> Option<FinancialDataset> {
    let header: Vec<String> = table.header()?.iter().map(|c| c.trim().to_string()).collect();
    if header.iter().filter(|h| !h.is_empty()).count() < 2 {
        return None;
    }
    let body = table.body();
    if body.len() < MIN_TRANSACTIONS {
        return None;
    }
    let roles = detect_roles(&header, body);
    let amount_col = roles.amount?;

    let records: Vec<TabularRecord> = body
        .iter()
        .map(|row| TabularRecord {
            raw_cells: row.clone(),
        })
        .collect();
    let transactions = derive_transactions(&records, roles);
    if transactions.len() < MIN_TRANSACTIONS {
        return None;
    }
    Some(FinancialDataset {
        page: table.page,
        header,
        records,
        datetime_col: roles.datetime,
        amount_col,
        category_col: roles.category,
        transactions,
    })
}

fn derive_transactions(records: &[TabularRecord], roles: ColumnRoles) -> Vec<ParsedTransaction> {
    let Some(amount_col) = roles.amount else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for record in records {
        let Some(amount) = record
            .raw_cells
            .get(amount_col)
            .and_then(|cell| parse_amount(cell))
        else {
            continue;
        };
        let timestamp = roles
            .datetime
            .and_then(|idx| record.raw_cells.get(idx))
            .and_then(|cell| parse_datetime(cell));
        let category = roles
            .category
            .and_then(|idx| record.raw_cells.get(idx))
            .map(|cell| cell.trim().to_string())
            .filter(|cell| !cell.is_empty());
        out.push(ParsedTransaction {
            timestamp,
            amount,
            category,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable {
            page: 1,
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn parses_statement_table() {
        let dataset = parse_tables(&[table(&[
            &["Date", "Description", "Amount"],
            &["2024-01-05", "Salary", "$2,500.00"],
            &["2024-01-20", "Rent", "(1,200.00)"],
            &["2024-02-01", "Groceries", "(84.50)"],
        ])])
        .expect("dataset");
        assert_eq!(dataset.amount_col, 2);
        assert_eq!(dataset.datetime_col, Some(0));
        assert_eq!(dataset.category_col, Some(1));
        let txns = dataset.transactions();
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].amount, 2500.0);
        assert_eq!(txns[1].amount, -1200.0);
        assert_eq!(txns[1].category.as_deref(), Some("Rent"));
    }

    #[test]
    fn unparsable_amount_rows_are_excluded() {
        let dataset = parse_tables(&[table(&[
            &["Date", "Amount"],
            &["2024-01-05", "100.00"],
            &["2024-01-06", "N/A"],
            &["2024-01-07", "50.00"],
        ])])
        .expect("dataset");
        assert_eq!(dataset.transactions().len(), 2);
    }

    #[test]
    fn bad_datetime_cell_blanks_timestamp_only() {
        let dataset = parse_tables(&[table(&[
            &["Date", "Amount"],
            &["2024-01-05", "100.00"],
            &["not a date", "50.00"],
        ])])
        .expect("dataset");
        let txns = dataset.transactions();
        assert_eq!(txns.len(), 2);
        assert!(txns[0].timestamp.is_some());
        assert!(txns[1].timestamp.is_none());
    }

    #[test]
    fn no_amount_column_means_no_dataset() {
        assert!(parse_tables(&[table(&[
            &["Chapter", "Title"],
            &["1", "Introduction"],
            &["2", "Methods"],
        ])])
        .is_none());
        assert!(parse_tables(&[]).is_none());
    }

    #[test]
    fn picks_the_table_with_most_transactions() {
        let small = table(&[
            &["Date", "Amount"],
            &["2024-01-05", "10.00"],
            &["2024-01-06", "20.00"],
        ]);
        let large = table(&[
            &["Date", "Amount"],
            &["2024-02-01", "1.00"],
            &["2024-02-02", "2.00"],
            &["2024-02-03", "3.00"],
        ]);
        let dataset = parse_tables(&[small, large]).expect("dataset");
        assert_eq!(dataset.transactions().len(), 3);
    }
}
