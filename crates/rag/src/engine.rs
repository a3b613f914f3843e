use serde::{Deserialize, Serialize};

use docmind_core::{
    ChunkConfig, Chunker, EngineError, Fingerprint, PageExtractor, RawTable, Result,
};
use docmind_finance::{
    advanced_stats, aggregate, breakdown, parse_chart_request, parse_tables, top_transactions,
    totals, wants_top_transactions, AdvancedStats, Breakdown, ChartKind, ChartRequest, Frequency,
    GroupBy, TimeSeries, TopTransactions, Totals,
};

use crate::embedding::EmbeddingClient;
use crate::index::MemoryIndex;
use crate::pipeline::{self, Generator, RagAnswer};
use crate::session::{SessionContext, SessionStore};

const DEFAULT_SESSION_CAPACITY: usize = 16;
const BREAKDOWN_TOP_N: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub chunk: ChunkConfig,
    pub session_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            session_capacity: DEFAULT_SESSION_CAPACITY,
        }
    }
}

/// Outcome of a build: whether anything was rebuilt and what the session
/// now contains. Zero passages is the "no content indexed" case, reported
/// rather than raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub rebuilt: bool,
    pub passages_indexed: usize,
    pub finance_detected: bool,
}

/// Chart-ready data produced from a free-text finance query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDirective {
    pub request: ChartRequest,
    pub series: ChartSeries,
    pub top: Option<TopTransactions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSeries {
    Grouped(Breakdown),
    Time(TimeSeries),
}

/// The document intelligence engine: one session per uploaded document,
/// retrieval over its passages, and financial reads over its detected
/// table. Every operation is a pure function of stored state and its
/// explicit parameters.
pub struct DocEngine {
    config: EngineConfig,
    embeddings: EmbeddingClient,
    sessions: SessionStore,
}

impl DocEngine {
    pub fn new(config: EngineConfig, embeddings: EmbeddingClient) -> Self {
        let capacity = config.session_capacity;
        Self {
            config,
            embeddings,
            sessions: SessionStore::new(capacity),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), EmbeddingClient::hash())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Index a document for a session. A fingerprint match reuses the
    /// existing context untouched; otherwise the replacement is built
    /// completely before it is swapped in, and an embedding failure
    /// leaves the previous state as it was.
    pub fn build_session(
        &self,
        session_id: &str,
        document: &[u8],
        extractor: &dyn PageExtractor,
        max_pages: Option<usize>,
    ) -> Result<BuildReport> {
        let fingerprint = Fingerprint::of_document(document, max_pages);
        if self.sessions.fingerprint(session_id).as_ref() == Some(&fingerprint) {
            let context = self
                .sessions
                .get(session_id)
                .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
            tracing::debug!(session = session_id, "fingerprint unchanged, reusing index");
            return Ok(BuildReport {
                rebuilt: false,
                passages_indexed: context.passage_count,
                finance_detected: context.finance.is_some(),
            });
        }

        let pages = extractor.extract(document, max_pages)?;
        let passages = Chunker::new(self.config.chunk).build(&pages);
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self
            .embeddings
            .embed_batch(&texts)
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        let mut index = MemoryIndex::new();
        let passage_count = passages.len();
        index.add(passages, vectors);

        let tables: Vec<RawTable> = pages.into_iter().flat_map(|p| p.tables).collect();
        let finance = parse_tables(&tables);
        let finance_detected = finance.is_some();

        tracing::info!(
            session = session_id,
            passages = passage_count,
            finance = finance_detected,
            "session built"
        );
        self.sessions.insert(
            session_id,
            SessionContext {
                fingerprint,
                index,
                finance,
                passage_count,
            },
        );
        Ok(BuildReport {
            rebuilt: true,
            passages_indexed: passage_count,
            finance_detected,
        })
    }

    pub fn close_session(&self, session_id: &str) -> bool {
        self.sessions.close(session_id)
    }

    pub fn answer(
        &self,
        session_id: &str,
        question: &str,
        top_k: usize,
        generator: &dyn Generator,
    ) -> Result<RagAnswer> {
        let session = self.session(session_id)?;
        // generator failures are absorbed inside the pipeline; the only
        // error left is a failed query embedding
        pipeline::answer(&session, &self.embeddings, question, top_k, generator)
            .map_err(|e| EngineError::Embedding(e.to_string()))
    }

    /// `None` when no financial table was detected, which is a normal outcome.
    pub fn totals(&self, session_id: &str) -> Result<Option<Totals>> {
        let session = self.session(session_id)?;
        Ok(session.finance.as_ref().map(|f| totals(f.transactions())))
    }

    pub fn aggregate(&self, session_id: &str, frequency: Frequency) -> Result<Option<TimeSeries>> {
        let session = self.session(session_id)?;
        Ok(session
            .finance
            .as_ref()
            .map(|f| aggregate(f.transactions(), frequency)))
    }

    pub fn breakdown(&self, session_id: &str, top_n: usize) -> Result<Option<Breakdown>> {
        let session = self.session(session_id)?;
        Ok(session
            .finance
            .as_ref()
            .map(|f| breakdown(f.transactions(), top_n, f.has_categories())))
    }

    pub fn advanced_stats(&self, session_id: &str) -> Result<Option<AdvancedStats>> {
        let session = self.session(session_id)?;
        Ok(session
            .finance
            .as_ref()
            .map(|f| advanced_stats(f.transactions())))
    }

    pub fn top_transactions(
        &self,
        session_id: &str,
        n: usize,
    ) -> Result<Option<TopTransactions>> {
        let session = self.session(session_id)?;
        Ok(session
            .finance
            .as_ref()
            .map(|f| top_transactions(f.transactions(), n)))
    }

    /// Turn a free-text finance query into chart-ready data: the parsed
    /// chart intent picks the series shape, and a top-transactions request
    /// rides along when asked for.
    pub fn chart_directive(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<Option<ChartDirective>> {
        let session = self.session(session_id)?;
        let Some(finance) = session.finance.as_ref() else {
            return Ok(None);
        };
        let request = parse_chart_request(query);
        let transactions = finance.transactions();

        let series = match request.group {
            GroupBy::Category if finance.has_categories() => {
                ChartSeries::Grouped(breakdown(transactions, BREAKDOWN_TOP_N, true))
            }
            GroupBy::Hour => ChartSeries::Time(aggregate(transactions, Frequency::Hourly)),
            GroupBy::Day => ChartSeries::Time(aggregate(transactions, Frequency::Daily)),
            GroupBy::Month => ChartSeries::Time(aggregate(transactions, Frequency::Monthly)),
            _ => match request.chart {
                ChartKind::Pie => ChartSeries::Grouped(breakdown(
                    transactions,
                    BREAKDOWN_TOP_N,
                    finance.has_categories(),
                )),
                _ => ChartSeries::Time(aggregate(transactions, Frequency::Daily)),
            },
        };
        let top = wants_top_transactions(query).then(|| top_transactions(transactions, 10));
        Ok(Some(ChartDirective {
            request,
            series,
            top,
        }))
    }

    fn session(&self, session_id: &str) -> Result<std::sync::Arc<SessionContext>> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }
}
