use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{HandlerError, HandlerKind, HandlerResponse, Query, ResponseHandler, ToolInvocation};
use crate::capability::{
    EmbeddingCapability, GenerationCapability, RetrievalCapability, RetrievedDocument,
    TEXT_GENERATION, VECTOR_SEARCH,
};
use crate::core::config::KnowledgeBaseSettings;
use crate::text::{find_phrase, tokenize};

const GREETINGS: &[&str] = &[
    "oi", "olá", "ola", "hey", "hi", "hello", "bom dia", "boa tarde", "boa noite",
    "good morning",
];
const THANKS: &[&str] = &["obrigado", "obrigada", "valeu", "thanks", "thank you"];
const FAREWELLS: &[&str] = &["tchau", "adeus", "até logo", "bye", "goodbye"];

const GREETING_REPLY: &str = "Hello! How can I help you today?\n\n\
I can look things up in the knowledge base, check the weather or search the web for news.";
const THANKS_REPLY: &str = "You're welcome! Anything else I can help with?";
const FAREWELL_REPLY: &str = "Goodbye! Come back any time.";

const ANSWER_CONFIDENCE: f32 = 0.8;
const NO_RESULTS_CONFIDENCE: f32 = 0.3;
const CANNED_CONFIDENCE: f32 = 1.0;

/// Answers from the document store: embed, retrieve, then generate over the
/// retrieved snippets.
pub struct KnowledgeBaseHandler {
    embedder: Arc<dyn EmbeddingCapability>,
    retriever: Arc<dyn RetrievalCapability>,
    generator: Arc<dyn GenerationCapability>,
    defaults: KnowledgeBaseSettings,
}

impl KnowledgeBaseHandler {
    pub fn new(
        embedder: Arc<dyn EmbeddingCapability>,
        retriever: Arc<dyn RetrievalCapability>,
        generator: Arc<dyn GenerationCapability>,
        defaults: KnowledgeBaseSettings,
    ) -> Self {
        Self {
            embedder,
            retriever,
            generator,
            defaults,
        }
    }

    async fn answer(&self, query: &str, documents: &[RetrievedDocument]) -> (String, bool) {
        let context = render_snippets(documents);

        if !self.generator.is_available().await {
            tracing::info!("Generation unavailable; returning retrieved snippets");
            return (raw_context_reply(&context), false);
        }

        match self.generator.generate(query, &context).await {
            Ok(text) if !text.trim().is_empty() => (text, true),
            Ok(_) => {
                tracing::warn!("Generation returned empty text; returning retrieved snippets");
                (raw_context_reply(&context), false)
            }
            Err(err) => {
                tracing::warn!("Generation failed, returning retrieved snippets: {}", err);
                (raw_context_reply(&context), false)
            }
        }
    }
}

fn pleasantry(text: &str) -> Option<&'static str> {
    let tokens = tokenize(text);
    if find_phrase(&tokens, GREETINGS).is_some() {
        Some(GREETING_REPLY)
    } else if find_phrase(&tokens, THANKS).is_some() {
        Some(THANKS_REPLY)
    } else if find_phrase(&tokens, FAREWELLS).is_some() {
        Some(FAREWELL_REPLY)
    } else {
        None
    }
}

/// `"{i}. (Score: {s:.3}) {text}"`, one per line, numbered from 1.
pub fn render_snippets(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("{}. (Score: {:.3}) {}", i + 1, doc.score, doc.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn raw_context_reply(context: &str) -> String {
    format!(
        "**Retrieved information:**\n\n{}\n\n_Note: text generation is unavailable; \
         showing the retrieved documents as-is._",
        context
    )
}

fn no_results_reply(query: &str) -> String {
    format!(
        "Sorry, I couldn't find anything about \"{}\" in the knowledge base.\n\n\
         Suggestions:\n\
         - Try rephrasing your question\n\
         - Ask me to \"search the web for ...\" for recent information\n\
         - Ask about the topics covered by the indexed documents",
        query.trim()
    )
}

#[async_trait]
impl ResponseHandler for KnowledgeBaseHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::KnowledgeBase
    }

    async fn process(&self, query: &Query) -> Result<HandlerResponse, HandlerError> {
        if let Some(reply) = pleasantry(&query.text) {
            return Ok(HandlerResponse::new(reply, CANNED_CONFIDENCE));
        }

        let k = query.context.max_results()?.unwrap_or(self.defaults.max_results);
        let threshold = query
            .context
            .score_threshold()?
            .unwrap_or(self.defaults.score_threshold);

        let vector = self.embedder.embed(&query.text).await?;
        let documents = self.retriever.search(&vector, k, threshold).await?;
        let search_call = ToolInvocation::new(
            VECTOR_SEARCH,
            json!({ "query": query.text, "k": k, "score_threshold": threshold }),
        );

        if documents.is_empty() {
            tracing::debug!("No documents above threshold {} for query", threshold);
            return Ok(HandlerResponse::new(no_results_reply(&query.text), NO_RESULTS_CONFIDENCE)
                .with_tool_invocation(search_call));
        }

        let (content, applied) = self.answer(&query.text, &documents).await;
        let context_docs = documents.into_iter().map(|doc| doc.text).collect();

        Ok(HandlerResponse::new(content, ANSWER_CONFIDENCE)
            .with_tool_invocation(search_call)
            .with_tool_invocation(ToolInvocation::new(
                TEXT_GENERATION,
                json!({ "applied": applied }),
            ))
            .with_context_docs(context_docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::mock::{FailingEmbedder, ScriptedGenerator, StaticRetriever};
    use crate::capability::{CapabilityErrorKind, HashingEmbedder};
    use crate::handlers::QueryContext;

    fn handler(
        retriever: Arc<StaticRetriever>,
        generator: Arc<ScriptedGenerator>,
    ) -> KnowledgeBaseHandler {
        KnowledgeBaseHandler::new(
            Arc::new(HashingEmbedder::new(64)),
            retriever,
            generator,
            KnowledgeBaseSettings::default(),
        )
    }

    fn ai_docs() -> Arc<StaticRetriever> {
        Arc::new(StaticRetriever::from_texts(&[
            ("Artificial intelligence is a technology", 0.82),
            ("Machine learning is a subfield of AI", 0.64),
        ]))
    }

    #[tokio::test]
    async fn greetings_skip_every_capability() {
        let retriever = ai_docs();
        let generator = Arc::new(ScriptedGenerator::replying("unused"));
        let handler = handler(retriever.clone(), generator.clone());

        let response = handler.process(&Query::new("Olá, tudo bem?")).await.expect("response");

        assert_eq!(response.confidence(), 1.0);
        assert!(response.tool_invocations().is_empty());
        assert!(retriever.calls().is_empty());
        assert_eq!(generator.generate_calls(), 0);
    }

    #[tokio::test]
    async fn pleasantries_match_whole_words() {
        let retriever = ai_docs();
        let handler = handler(
            retriever.clone(),
            Arc::new(ScriptedGenerator::replying("AI answer")),
        );

        let response = handler
            .process(&Query::new("What is this architecture?"))
            .await
            .expect("response");

        assert_eq!(response.confidence(), 0.8);
        assert_eq!(retriever.calls().len(), 1);
    }

    #[tokio::test]
    async fn generated_answer_records_both_invocations() {
        let handler = handler(
            ai_docs(),
            Arc::new(ScriptedGenerator::replying("AI is artificial intelligence")),
        );

        let response = handler.process(&Query::new("What is AI?")).await.expect("response");

        assert_eq!(response.content(), "AI is artificial intelligence");
        assert_eq!(response.confidence(), 0.8);
        let invocations = response.tool_invocations();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].capability, VECTOR_SEARCH);
        assert_eq!(invocations[0].parameters["k"], 3);
        assert_eq!(invocations[1].parameters, json!({ "applied": true }));
        assert_eq!(response.context_docs().len(), 2);
    }

    #[tokio::test]
    async fn unavailable_generation_returns_raw_snippets() {
        let generator = Arc::new(ScriptedGenerator::unavailable());
        let handler = handler(ai_docs(), generator.clone());

        let response = handler.process(&Query::new("What is AI?")).await.expect("response");

        assert!(response
            .content()
            .contains("1. (Score: 0.820) Artificial intelligence is a technology"));
        assert_eq!(response.tool_invocations()[1].parameters, json!({ "applied": false }));
        assert_eq!(generator.generate_calls(), 0);
    }

    #[tokio::test]
    async fn failing_generation_degrades_to_snippets() {
        let handler = handler(ai_docs(), Arc::new(ScriptedGenerator::failing()));

        let response = handler.process(&Query::new("What is AI?")).await.expect("response");

        assert!(response.content().starts_with("**Retrieved information:**"));
        assert_eq!(response.tool_invocations()[1].parameters["applied"], false);
    }

    #[tokio::test]
    async fn empty_retrieval_is_low_confidence() {
        let handler = handler(
            Arc::new(StaticRetriever::empty()),
            Arc::new(ScriptedGenerator::replying("unused")),
        );

        let response = handler.process(&Query::new("quantum gravity")).await.expect("response");

        assert_eq!(response.confidence(), 0.3);
        assert!(response.content().contains("rephrasing"));
        assert!(response.context_docs().is_empty());
    }

    #[tokio::test]
    async fn context_overrides_count_and_threshold() {
        let retriever = ai_docs();
        let handler = handler(retriever.clone(), Arc::new(ScriptedGenerator::replying("ok")));
        let mut context = QueryContext::new();
        context.insert("max_results", 1);
        context.insert("confidence_threshold", 0.7);

        let response = handler
            .process(&Query::with_context("What is AI?", context))
            .await
            .expect("response");

        assert_eq!(retriever.calls(), vec![(1, 0.7)]);
        assert_eq!(
            response.context_docs(),
            ["Artificial intelligence is a technology".to_string()]
        );
    }

    #[tokio::test]
    async fn retrieval_failure_propagates_as_capability_error() {
        let handler = handler(
            Arc::new(StaticRetriever::failing()),
            Arc::new(ScriptedGenerator::replying("unused")),
        );

        let err = handler.process(&Query::new("What is AI?")).await.unwrap_err();

        match err {
            HandlerError::Capability(err) => {
                assert_eq!(err.capability, VECTOR_SEARCH);
                assert_eq!(err.kind, CapabilityErrorKind::Unavailable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let handler = KnowledgeBaseHandler::new(
            Arc::new(FailingEmbedder),
            ai_docs(),
            Arc::new(ScriptedGenerator::replying("unused")),
            KnowledgeBaseSettings::default(),
        );

        assert!(matches!(
            handler.process(&Query::new("What is AI?")).await,
            Err(HandlerError::Capability(_))
        ));
    }
}
