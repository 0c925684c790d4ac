use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{HandlerError, HandlerKind, HandlerResponse, Query, ResponseHandler, ToolInvocation};
use crate::capability::{DataCapability, MAX_SEARCH_RESULTS};

const SEARCH_CONFIDENCE: f32 = 0.7;

/// Web search with a short explanatory preamble. Confidence is fixed: the
/// search capability reports no relevance score.
pub struct LiveSearchHandler {
    search: Arc<dyn DataCapability>,
    default_results: usize,
}

impl LiveSearchHandler {
    pub fn new(search: Arc<dyn DataCapability>, default_results: usize) -> Self {
        Self {
            search,
            default_results,
        }
    }
}

#[async_trait]
impl ResponseHandler for LiveSearchHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::LiveSearch
    }

    async fn process(&self, query: &Query) -> Result<HandlerResponse, HandlerError> {
        let num_results = query
            .context
            .max_results()?
            .unwrap_or(self.default_results)
            .clamp(1, MAX_SEARCH_RESULTS);
        let parameters = json!({ "query": query.text, "num_results": num_results });

        let results = self.search.invoke(&parameters).await?;

        let content = format!(
            "Up-to-date information from the web about \"{}\":\n\n{}\n\n\
             This information was gathered from online sources in real time.",
            query.text.trim(),
            results.trim_end()
        );

        Ok(HandlerResponse::new(content, SEARCH_CONFIDENCE)
            .with_tool_invocation(ToolInvocation::new(self.search.name(), parameters))
            .with_context_docs(vec![results]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::mock::ScriptedData;
    use crate::capability::{CapabilityError, WEB_SEARCH};
    use crate::handlers::QueryContext;

    #[tokio::test]
    async fn wraps_results_and_reports_fixed_confidence() {
        let search = Arc::new(ScriptedData::ok(
            WEB_SEARCH,
            "**Headline**\nBody\nSource: https://a\n",
        ));
        let handler = LiveSearchHandler::new(search.clone(), 3);

        let response = handler.process(&Query::new("últimas notícias")).await.expect("response");

        assert_eq!(response.confidence(), 0.7);
        assert!(response.content().contains("\"últimas notícias\""));
        assert!(response.content().contains("**Headline**"));
        assert_eq!(search.calls(), vec![json!({ "query": "últimas notícias", "num_results": 3 })]);
        assert_eq!(response.tool_invocations()[0].capability, WEB_SEARCH);
    }

    #[tokio::test]
    async fn empty_results_keep_the_same_confidence() {
        let handler =
            LiveSearchHandler::new(Arc::new(ScriptedData::ok(WEB_SEARCH, "No results found.")), 3);

        let response = handler.process(&Query::new("buscar xyzzy")).await.expect("response");

        assert_eq!(response.confidence(), 0.7);
    }

    #[tokio::test]
    async fn result_count_comes_from_context() {
        let search = Arc::new(ScriptedData::ok(WEB_SEARCH, "ok"));
        let handler = LiveSearchHandler::new(search.clone(), 3);
        let mut context = QueryContext::new();
        context.insert("max_results", 5);

        handler
            .process(&Query::with_context("news", context))
            .await
            .expect("response");

        assert_eq!(search.calls()[0]["num_results"], 5);
    }

    #[tokio::test]
    async fn result_count_is_capped_at_the_search_limit() {
        let search = Arc::new(ScriptedData::ok(WEB_SEARCH, "ok"));
        let handler = LiveSearchHandler::new(search.clone(), 3);
        let mut context = QueryContext::new();
        context.insert("max_results", 40);

        let response = handler
            .process(&Query::with_context("news", context))
            .await
            .expect("response");

        assert_eq!(search.calls()[0]["num_results"], MAX_SEARCH_RESULTS);
        assert_eq!(
            response.tool_invocations()[0].parameters["num_results"],
            MAX_SEARCH_RESULTS
        );
    }

    #[tokio::test]
    async fn search_failure_is_a_capability_error() {
        let handler = LiveSearchHandler::new(
            Arc::new(ScriptedData::err(
                WEB_SEARCH,
                CapabilityError::unavailable(WEB_SEARCH, "timeout"),
            )),
            3,
        );

        assert!(matches!(
            handler.process(&Query::new("news")).await,
            Err(HandlerError::Capability(_))
        ));
    }
}
