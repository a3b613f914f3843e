use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Hour,
    Day,
    Month,
    Category,
    Auto,
}

/// What the user asked the finance assistant to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub chart: ChartKind,
    pub group: GroupBy,
}

/// Tiny rule-based intent parser for free-text finance queries. Unmatched
/// input yields `ChartKind::None` / `GroupBy::Auto` so the caller falls
/// through to its default rendering.
pub fn parse_chart_request(text: &str) -> ChartRequest {
    let t = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

    let chart = if contains_any(&t, &["bar chart", "barchart", "bar"]) {
        ChartKind::Bar
    } else if contains_any(&t, &["pie chart", "pie"]) {
        ChartKind::Pie
    } else if contains_any(&t, &["line chart", "trend", "over time", "time series", "timeline", "line"]) {
        ChartKind::Line
    } else {
        ChartKind::None
    };

    let group = if contains_any(&t, &["category", "merchant", "type", "by category"]) {
        GroupBy::Category
    } else if contains_any(&t, &["hour", "hourly"]) {
        GroupBy::Hour
    } else if contains_any(&t, &["day", "daily"]) {
        GroupBy::Day
    } else if contains_any(&t, &["month", "monthly"]) {
        GroupBy::Month
    } else {
        GroupBy::Auto
    };

    ChartRequest { chart, group }
}

/// Detects "show me the biggest transactions" style requests: a ranking
/// word plus something rankable, in any order.
pub fn wants_top_transactions(text: &str) -> bool {
    let t = text.to_lowercase();
    let ranked = contains_any(&t, &["top", "largest", "biggest", "highest"]);
    let subject = contains_any(&t, &["expense", "income", "transaction", "spending", "payment"]);
    ranked && subject
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_chart_and_group_words() {
        let req = parse_chart_request("bar chart by category");
        assert_eq!(req.chart, ChartKind::Bar);
        assert_eq!(req.group, GroupBy::Category);

        let req = parse_chart_request("monthly trend");
        assert_eq!(req.chart, ChartKind::Line);
        assert_eq!(req.group, GroupBy::Month);

        let req = parse_chart_request("PIE  chart");
        assert_eq!(req.chart, ChartKind::Pie);
        assert_eq!(req.group, GroupBy::Auto);
    }

    #[test]
    fn unmatched_text_falls_through() {
        let req = parse_chart_request("what happened in march");
        assert_eq!(req.chart, ChartKind::None);
        assert_eq!(req.group, GroupBy::Auto);
    }

    #[test]
    fn detects_top_transaction_requests() {
        assert!(wants_top_transactions("show top 10 expenses"));
        assert!(wants_top_transactions("largest income this year"));
        assert!(!wants_top_transactions("pie chart"));
    }
}
