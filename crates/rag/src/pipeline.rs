use anyhow::Result;
use serde::{Deserialize, Serialize};

use docmind_core::normalize_question;
use docmind_llm::{LlmClient, LlmRequest};

use crate::embedding::EmbeddingClient;
use crate::index::RetrievedPassage;
use crate::intent::{classify_question, extract_financial_concepts, QuestionIntent};
use crate::session::SessionContext;

const EXTRACTIVE_PASSAGES: usize = 3;
const ANSWER_MAX_TOKENS: u32 = 1024;

const CLARIFY_SUMMARY: &str = "Do you want a summary of the whole document, or a \
specific section or page range? Short bullets or a detailed paragraph?";

const NO_CONTENT: &str = "No text could be indexed from this document, so there is \
nothing to search. If it is a scanned PDF, the pages may contain no selectable text.";

/// External text-generation collaborator. `Err` and an empty string are the
/// same situation to the pipeline: fall back to extractive output.
pub trait Generator {
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

impl Generator for LlmClient {
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let response = self.chat_blocking(&LlmRequest {
            system: Some(
                "You answer user questions about an uploaded document using provided context."
                    .to_string(),
            ),
            user: prompt.to_string(),
            max_tokens: Some(max_tokens),
        })?;
        Ok(response.content)
    }
}

/// Which path produced the answer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Generated,
    Extractive,
    Clarification,
    ConceptList,
    NoContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<RetrievedPassage>,
    pub kind: AnswerKind,
}

/// Answer a question against one session: normalize, run the intent
/// heuristics, retrieve, then generate, degrading to an extractive answer
/// whenever the generator is unavailable or returns nothing. Every path
/// carries its supporting sources.
pub fn answer(
    session: &SessionContext,
    embeddings: &EmbeddingClient,
    question: &str,
    top_k: usize,
    generator: &dyn Generator,
) -> Result<RagAnswer> {
    let normalized = normalize_question(question);
    let question = if normalized.is_empty() {
        question.trim()
    } else {
        normalized.as_str()
    };

    if session.index.is_empty() {
        return Ok(RagAnswer {
            answer: NO_CONTENT.to_string(),
            sources: Vec::new(),
            kind: AnswerKind::NoContent,
        });
    }

    if classify_question(question) == QuestionIntent::ClarifySummary {
        return Ok(RagAnswer {
            answer: CLARIFY_SUMMARY.to_string(),
            sources: Vec::new(),
            kind: AnswerKind::Clarification,
        });
    }

    let query_vector = embeddings.embed(question)?;
    let sources = session.index.search(&query_vector, top_k.max(1));

    if classify_question(question) == QuestionIntent::FinancialConcepts {
        let texts: Vec<String> = sources.iter().map(|s| s.text.clone()).collect();
        let concepts = extract_financial_concepts(&texts);
        if !concepts.is_empty() {
            let listed = concepts
                .iter()
                .take(10)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(RagAnswer {
                answer: format!(
                    "The retrieved parts of the document mention these financial \
                     concepts: {listed}."
                ),
                sources,
                kind: AnswerKind::ConceptList,
            });
        }
    }

    let prompt = build_prompt(question, &sources);
    match generator.generate(&prompt, ANSWER_MAX_TOKENS) {
        Ok(content) if !content.trim().is_empty() => Ok(RagAnswer {
            answer: content.trim().to_string(),
            sources,
            kind: AnswerKind::Generated,
        }),
        Ok(_) => {
            tracing::warn!("generator returned empty output, using extractive fallback");
            Ok(extractive_fallback(sources))
        }
        Err(err) => {
            tracing::warn!(error = %err, "generator unavailable, using extractive fallback");
            Ok(extractive_fallback(sources))
        }
    }
}

/// Grounding prompt: retrieved passages with their page tags, then the
/// question, with instructions to stay inside the context and cite pages.
fn build_prompt(question: &str, sources: &[RetrievedPassage]) -> String {
    let mut context = String::new();
    for source in sources {
        context.push_str(&format!("[page {}] {}\n\n", source.page, source.text));
    }
    format!(
        "Answer the question using only the context below.\n\
         - If the context does not contain the answer, say you cannot answer from this document.\n\
         - Cite supporting pages as [page N].\n\
         \n\
         Context:\n{context}\n\
         Question: {question}\n\
         Answer:"
    )
}

fn extractive_fallback(sources: Vec<RetrievedPassage>) -> RagAnswer {
    let top: Vec<String> = sources
        .iter()
        .take(EXTRACTIVE_PASSAGES)
        .map(|s| s.text.clone())
        .collect();
    let answer = if top.is_empty() {
        "Nothing relevant was found in the document.".to_string()
    } else {
        top.join("\n\n")
    };
    RagAnswer {
        answer,
        sources,
        kind: AnswerKind::Extractive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use docmind_core::{ChunkConfig, Chunker, ExtractedPage, Fingerprint};
    use crate::index::MemoryIndex;
    use crate::session::SessionContext;

    struct StubGenerator(Result<String, String>);

    impl Generator for StubGenerator {
        fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(anyhow!(msg.clone())),
            }
        }
    }

    fn session_with(pages: &[(u32, &str)]) -> (SessionContext, EmbeddingClient) {
        let embeddings = EmbeddingClient::hash();
        let extracted: Vec<ExtractedPage> = pages
            .iter()
            .map(|(page, text)| ExtractedPage {
                page: *page,
                text: text.to_string(),
                tables: Vec::new(),
            })
            .collect();
        let passages = Chunker::new(ChunkConfig::default()).build(&extracted);
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = embeddings.embed_batch(&texts).unwrap();
        let mut index = MemoryIndex::new();
        let passage_count = passages.len();
        index.add(passages, vectors);
        (
            SessionContext {
                fingerprint: Fingerprint::of_document(b"test", None),
                index,
                finance: None,
                passage_count,
            },
            embeddings,
        )
    }

    #[test]
    fn generated_answer_keeps_sources() {
        let (session, embeddings) = session_with(&[(1, "interest accrues monthly")]);
        let generator = StubGenerator(Ok("Interest accrues monthly [page 1].".to_string()));
        let result = answer(&session, &embeddings, "when does interest accrue?", 4, &generator)
            .unwrap();
        assert_eq!(result.kind, AnswerKind::Generated);
        assert!(!result.sources.is_empty());
    }

    #[test]
    fn generator_failure_degrades_to_extractive() {
        let (session, embeddings) = session_with(&[(1, "the warranty lasts two years")]);
        let generator = StubGenerator(Err("rate limited".to_string()));
        let result = answer(&session, &embeddings, "how long is the warranty?", 4, &generator)
            .unwrap();
        assert_eq!(result.kind, AnswerKind::Extractive);
        assert!(!result.sources.is_empty());
        assert!(result.answer.contains("warranty"));
    }

    #[test]
    fn empty_generation_degrades_identically() {
        let (session, embeddings) = session_with(&[(1, "the warranty lasts two years")]);
        let generator = StubGenerator(Ok("   ".to_string()));
        let result = answer(&session, &embeddings, "how long is the warranty?", 4, &generator)
            .unwrap();
        assert_eq!(result.kind, AnswerKind::Extractive);
    }

    #[test]
    fn bare_summarize_asks_for_scope_without_searching() {
        let (session, embeddings) = session_with(&[(1, "body text")]);
        let generator = StubGenerator(Err("should not be called".to_string()));
        let result = answer(&session, &embeddings, "summarize", 4, &generator).unwrap();
        assert_eq!(result.kind, AnswerKind::Clarification);
        assert!(result.sources.is_empty());
    }

    #[test]
    fn concept_question_lists_terms_without_generator() {
        let (session, embeddings) = session_with(&[(
            1,
            "Total revenue and interest expense appear in the statement.",
        )]);
        let generator = StubGenerator(Err("should not be called".to_string()));
        let result = answer(
            &session,
            &embeddings,
            "what financial concepts are in this document?",
            4,
            &generator,
        )
        .unwrap();
        assert_eq!(result.kind, AnswerKind::ConceptList);
        assert!(result.answer.contains("revenue"));
        assert!(!result.sources.is_empty());
    }

    #[test]
    fn empty_index_reports_no_content() {
        let embeddings = EmbeddingClient::hash();
        let session = SessionContext {
            fingerprint: Fingerprint::of_document(b"empty", None),
            index: MemoryIndex::new(),
            finance: None,
            passage_count: 0,
        };
        let generator = StubGenerator(Ok("unused".to_string()));
        let result = answer(&session, &embeddings, "anything?", 4, &generator).unwrap();
        assert_eq!(result.kind, AnswerKind::NoContent);
        assert!(result.sources.is_empty());
    }
}
