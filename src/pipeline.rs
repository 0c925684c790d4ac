//! The boundary operation: route a query, then score the answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capability::{
    create_embedder, create_generator, DataCapability, EmbeddingCapability,
    GenerationCapability, OpenWeatherClient, QdrantRetriever, RetrievalCapability,
    WebSearchClient,
};
use crate::core::config::Settings;
use crate::evaluation::{EvaluationMetrics, ResponseEvaluator};
use crate::handlers::types::{
    CONFIDENCE_THRESHOLD_KEY, ESCALATION_THRESHOLD_KEY, MAX_RESULTS_KEY,
};
use crate::handlers::{
    KnowledgeBaseHandler, LiveSearchHandler, Query, QueryContext, StructuredDataHandler,
    ToolInvocation,
};
use crate::router::{EscalationPolicy, QueryRouter};
use crate::state::error::InitializationError;

/// Every external service the pipeline talks to.
#[derive(Clone)]
pub struct Capabilities {
    pub embedder: Arc<dyn EmbeddingCapability>,
    pub retriever: Arc<dyn RetrievalCapability>,
    pub generator: Arc<dyn GenerationCapability>,
    pub weather: Arc<dyn DataCapability>,
    pub web_search: Arc<dyn DataCapability>,
}

impl Capabilities {
    pub fn from_settings(settings: &Settings) -> Result<Self, InitializationError> {
        Ok(Self {
            embedder: create_embedder(&settings.embedding)?,
            retriever: Arc::new(QdrantRetriever::new(&settings.vector_store)?),
            generator: create_generator(&settings.generation)?,
            weather: Arc::new(OpenWeatherClient::new(&settings.weather)?),
            web_search: Arc::new(WebSearchClient::new(&settings.web_search)?),
        })
    }
}

/// Per-request options. Unknown keys are passed through to the handlers'
/// query context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub max_results: Option<usize>,
    pub confidence_threshold: Option<f32>,
    pub escalation_threshold: Option<f32>,
    pub evaluate: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_results: None,
            confidence_threshold: None,
            escalation_threshold: None,
            evaluate: true,
            extra: Map::new(),
        }
    }
}

impl RequestConfig {
    fn to_context(&self) -> QueryContext {
        let mut context = QueryContext::from(self.extra.clone());
        if let Some(n) = self.max_results {
            context.insert(MAX_RESULTS_KEY, n);
        }
        if let Some(t) = self.confidence_threshold {
            context.insert(CONFIDENCE_THRESHOLD_KEY, f64::from(t));
        }
        if let Some(t) = self.escalation_threshold {
            context.insert(ESCALATION_THRESHOLD_KEY, f64::from(t));
        }
        context
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    pub response_text: String,
    pub handler_used: String,
    pub confidence: f32,
    pub tool_invocations: Vec<ToolInvocation>,
    pub routing_reason: String,
    pub escalated: bool,
    pub evaluation_metrics: Option<EvaluationMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<String>,
}

pub struct AssistantPipeline {
    router: QueryRouter,
    evaluator: ResponseEvaluator,
}

impl AssistantPipeline {
    pub fn new(
        capabilities: &Capabilities,
        settings: &Settings,
    ) -> Result<Self, InitializationError> {
        let knowledge_base = KnowledgeBaseHandler::new(
            capabilities.embedder.clone(),
            capabilities.retriever.clone(),
            capabilities.generator.clone(),
            settings.knowledge_base.clone(),
        );
        let live_search = LiveSearchHandler::new(
            capabilities.web_search.clone(),
            settings.live_search.max_results,
        );
        let structured_data = StructuredDataHandler::new(capabilities.weather.clone())
            .map_err(InitializationError::patterns("location"))?;

        let router = QueryRouter::new(
            Arc::new(knowledge_base),
            Arc::new(live_search),
            Arc::new(structured_data),
            EscalationPolicy::from(&settings.routing),
        );
        let evaluator = ResponseEvaluator::new(capabilities.embedder.clone())
            .map_err(InitializationError::patterns("safety"))?;

        Ok(Self { router, evaluator })
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    /// Classify, dispatch, optionally escalate, then evaluate; each step is
    /// awaited in order. Only evaluation can fail, and that failure is
    /// reported in the reply rather than replacing it.
    pub async fn handle_request(&self, query: &str, config: &RequestConfig) -> AssistantReply {
        let query = Query::with_context(query, config.to_context());
        let routed = self.router.route(&query).await;

        let (evaluation_metrics, evaluation_error) = if config.evaluate {
            match self
                .evaluator
                .evaluate(&query.text, routed.response.content(), routed.response.context_docs())
                .await
            {
                Ok(metrics) => (Some(metrics), None),
                Err(err) => {
                    tracing::warn!("Evaluation failed: {}", err);
                    (None, Some(err.to_string()))
                }
            }
        } else {
            (None, None)
        };

        AssistantReply {
            response_text: routed.response.content().to_string(),
            handler_used: routed.handler_used,
            confidence: routed.response.confidence(),
            tool_invocations: routed.response.tool_invocations().to_vec(),
            routing_reason: routed.decision.reason(),
            escalated: routed.escalation.is_some(),
            evaluation_metrics,
            evaluation_error,
        }
    }
}
