use docmind_finance::MONEY_RE;

/// Finance vocabulary scanned for when a user asks about financial
/// concepts in the document.
const FINANCE_TERMS: &[&str] = &[
    "revenue",
    "income",
    "expense",
    "expenses",
    "cost",
    "costs",
    "profit",
    "loss",
    "balance",
    "debit",
    "credit",
    "interest",
    "tax",
    "invoice",
    "payment",
    "transaction",
    "cash flow",
    "budget",
    "assets",
    "liabilities",
    "equity",
    "fee",
    "charge",
    "refund",
    "amount",
    "total",
    "subtotal",
    "account",
    "statement",
];

const SCOPE_MARKERS: &[&str] = &[
    "page", "pages", "section", "chapter", "table", "about", "focus on", "only",
];

/// How the pipeline should treat a question before any retrieval happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionIntent {
    /// Nothing special: retrieve and answer.
    None,
    /// A "summarize" request with no scope; ask the user to narrow it.
    ClarifySummary,
    /// The user wants the financial terminology found in the document.
    FinancialConcepts,
}

/// Classify a normalized question. Pure and independently testable.
pub fn classify_question(question: &str) -> QuestionIntent {
    let q = question.to_lowercase();
    if wants_summary(&q) && !SCOPE_MARKERS.iter().any(|m| q.contains(m)) {
        return QuestionIntent::ClarifySummary;
    }
    if looks_like_concepts_question(&q) {
        return QuestionIntent::FinancialConcepts;
    }
    QuestionIntent::None
}

fn wants_summary(q: &str) -> bool {
    ["summarize", "summary", "summarise"]
        .iter()
        .any(|k| q.contains(k))
}

fn looks_like_concepts_question(q: &str) -> bool {
    q.contains("financial concept")
        || q.contains("financial concepts")
        || (q.contains("financial")
            && ["concept", "concepts", "terms", "topics"]
                .iter()
                .any(|w| q.contains(w)))
}

/// Scan retrieved passage text for finance vocabulary, de-duplicated and in
/// stable vocabulary order. A money-looking token adds "currency amounts".
pub fn extract_financial_concepts(passages: &[String]) -> Vec<String> {
    let joined = passages.join("\n");
    let lowered = joined.to_lowercase();
    let mut found = Vec::new();
    for term in FINANCE_TERMS {
        if lowered.contains(term) && !found.iter().any(|f: &String| f == term) {
            found.push(term.to_string());
        }
    }
    if MONEY_RE.is_match(&joined) {
        found.push("currency amounts".to_string());
    }
    found
}
