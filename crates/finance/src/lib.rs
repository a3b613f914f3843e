mod aggregate;
mod columns;
mod dataset;
mod datetime;
mod intent;
mod money;

pub use aggregate::{
    advanced_stats, aggregate, breakdown, top_transactions, totals, AdvancedStats, Breakdown,
    BreakdownDimension, Frequency, TimeBucket, TimeSeries, TopTransactions, Totals,
};
pub use columns::{detect_roles, ColumnRoles};
pub use dataset::{parse_tables, FinancialDataset, ParsedTransaction, TabularRecord};
pub use datetime::parse_datetime;
pub use intent::{parse_chart_request, wants_top_transactions, ChartKind, ChartRequest, GroupBy};
pub use money::{looks_like_amount, parse_amount, MONEY_RE};
