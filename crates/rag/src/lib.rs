mod embedding;
mod engine;
mod index;
mod intent;
mod pipeline;
mod session;

pub use embedding::{EmbeddingBackend, EmbeddingClient, OpenAiEmbeddingClient};
pub use engine::{BuildReport, ChartDirective, ChartSeries, DocEngine, EngineConfig};
pub use index::{MemoryIndex, RetrievedPassage};
pub use intent::{classify_question, extract_financial_concepts, QuestionIntent};
pub use pipeline::{answer, AnswerKind, Generator, RagAnswer};
pub use session::{SessionContext, SessionStore};
pub use docmind_llm::{LlmClient, LlmProvider, LlmRequest, LlmResponse};
