use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::dataset::ParsedTransaction;

/// Row count and signed sums over every normalized transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    pub rows: usize,
    pub sum: f64,
    pub income: f64,
    pub expense: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Hourly,
    Daily,
    Monthly,
}

impl Frequency {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "hour" | "hourly" => Some(Self::Hourly),
            "day" | "daily" => Some(Self::Daily),
            "month" | "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    fn floor(&self, ts: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Hourly => ts.date().and_hms_opt(ts.hour(), 0, 0),
            Self::Daily => ts.date().and_hms_opt(0, 0, 0),
            Self::Monthly => {
                NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1)?.and_hms_opt(0, 0, 0)
            }
        }
    }

    fn label(&self, ts: NaiveDateTime) -> String {
        match self {
            Self::Hourly => ts.format("%Y-%m-%d %H:00").to_string(),
            Self::Daily => ts.format("%Y-%m-%d").to_string(),
            Self::Monthly => ts.format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBucket {
    pub start: NaiveDateTime,
    pub label: String,
    pub total: f64,
}

/// Chronological per-bucket sums. Transactions without a resolvable
/// timestamp never enter a bucket; `skipped` reports how many were left
/// out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    pub buckets: Vec<TimeBucket>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownDimension {
    Category,
    Month,
}

/// Top groups by absolute summed amount, labels and values aligned by
/// index. The tail beyond `top_n` collapses into one `other` bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakdown {
    pub dimension: BreakdownDimension,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvancedStats {
    pub rows: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub income_count: usize,
    pub expense_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopTransactions {
    pub income: Vec<ParsedTransaction>,
    pub expense: Vec<ParsedTransaction>,
}

pub fn totals(transactions: &[ParsedTransaction]) -> Totals {
    let rows = transactions.len();
    let sum: f64 = transactions.iter().map(|t| t.amount).sum();
    let income: f64 = transactions
        .iter()
        .map(|t| t.amount)
        .filter(|a| *a > 0.0)
        .sum();
    let expense: f64 = transactions
        .iter()
        .map(|t| t.amount)
        .filter(|a| *a < 0.0)
        .sum();
    let mean = if rows == 0 { 0.0 } else { sum / rows as f64 };
    Totals {
        rows,
        sum,
        income,
        expense,
        mean,
    }
}

pub fn aggregate(transactions: &[ParsedTransaction], frequency: Frequency) -> TimeSeries {
    let mut sums: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    let mut skipped = 0usize;
    for txn in transactions {
        let floored = txn.timestamp.and_then(|ts| frequency.floor(ts));
        match floored {
            Some(start) => *sums.entry(start).or_insert(0.0) += txn.amount,
            None => skipped += 1,
        }
    }
    let buckets = sums
        .into_iter()
        .map(|(start, total)| TimeBucket {
            start,
            label: frequency.label(start),
            total,
        })
        .collect();
    TimeSeries { buckets, skipped }
}

pub fn breakdown(
    transactions: &[ParsedTransaction],
    top_n: usize,
    use_category: bool,
) -> Breakdown {
    let dimension = if use_category {
        BreakdownDimension::Category
    } else {
        BreakdownDimension::Month
    };
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for txn in transactions {
        let label = match dimension {
            BreakdownDimension::Category => txn.category.clone(),
            BreakdownDimension::Month => txn.timestamp.map(|ts| ts.format("%Y-%m").to_string()),
        };
        if let Some(label) = label {
            *sums.entry(label).or_insert(0.0) += txn.amount;
        }
    }
    let mut groups: Vec<(String, f64)> = sums
        .into_iter()
        .map(|(label, sum)| (label, sum.abs()))
        .collect();
    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let top_n = top_n.max(1);
    let mut labels = Vec::new();
    let mut values = Vec::new();
    for (label, value) in groups.iter().take(top_n) {
        labels.push(label.clone());
        values.push(*value);
    }
    if groups.len() > top_n {
        let rest: f64 = groups[top_n..].iter().map(|(_, v)| v).sum();
        labels.push("other".to_string());
        values.push(rest);
    }
    Breakdown {
        dimension,
        labels,
        values,
    }
}

pub fn advanced_stats(transactions: &[ParsedTransaction]) -> AdvancedStats {
    let mut amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();
    if amounts.is_empty() {
        return AdvancedStats::default();
    }
    amounts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rows = amounts.len();
    let sum: f64 = amounts.iter().sum();
    let mean = sum / rows as f64;
    let median = if rows % 2 == 1 {
        amounts[rows / 2]
    } else {
        (amounts[rows / 2 - 1] + amounts[rows / 2]) / 2.0
    };
    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / rows as f64;
    AdvancedStats {
        rows,
        mean,
        median,
        std_dev: variance.sqrt(),
        min: amounts[0],
        max: amounts[rows - 1],
        income_count: transactions.iter().filter(|t| t.amount > 0.0).count(),
        expense_count: transactions.iter().filter(|t| t.amount < 0.0).count(),
    }
}

pub fn top_transactions(transactions: &[ParsedTransaction], n: usize) -> TopTransactions {
    let mut income: Vec<ParsedTransaction> = transactions
        .iter()
        .filter(|t| t.amount > 0.0)
        .cloned()
        .collect();
    let mut expense: Vec<ParsedTransaction> = transactions
        .iter()
        .filter(|t| t.amount < 0.0)
        .cloned()
        .collect();
    // stable sort keeps original row order for equal magnitudes
    income.sort_by(|a, b| {
        b.amount
            .abs()
            .partial_cmp(&a.amount.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    expense.sort_by(|a, b| {
        b.amount
            .abs()
            .partial_cmp(&a.amount.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    income.truncate(n);
    expense.truncate(n);
    TopTransactions { income, expense }
}
