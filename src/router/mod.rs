//! Query routing: keyword classification, dispatch, and confidence-based
//! escalation to a fallback handler.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::handlers::{HandlerError, HandlerKind, HandlerResponse, Query, ResponseHandler};

pub mod classifier;
pub mod escalation;

pub use classifier::{classify, RoutingDecision};
pub use escalation::{EscalationPolicy, EscalationRecord};

const INTERNAL_FAILURE_REPLY: &str =
    "Sorry, something went wrong while processing your request. Please try again.";

/// The handler response plus routing metadata. The response itself is never
/// modified by the router.
#[derive(Debug, Clone)]
pub struct RoutedResult {
    pub response: HandlerResponse,
    pub handler_used: String,
    pub decision: RoutingDecision,
    pub escalation: Option<EscalationRecord>,
}

pub struct QueryRouter {
    knowledge_base: Arc<dyn ResponseHandler>,
    live_search: Arc<dyn ResponseHandler>,
    structured_data: Arc<dyn ResponseHandler>,
    policy: EscalationPolicy,
}

impl QueryRouter {
    pub fn new(
        knowledge_base: Arc<dyn ResponseHandler>,
        live_search: Arc<dyn ResponseHandler>,
        structured_data: Arc<dyn ResponseHandler>,
        policy: EscalationPolicy,
    ) -> Self {
        debug_assert_eq!(knowledge_base.kind(), HandlerKind::KnowledgeBase);
        debug_assert_eq!(live_search.kind(), HandlerKind::LiveSearch);
        debug_assert_eq!(structured_data.kind(), HandlerKind::StructuredData);
        Self {
            knowledge_base,
            live_search,
            structured_data,
            policy,
        }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    fn handler(&self, kind: HandlerKind) -> &Arc<dyn ResponseHandler> {
        match kind {
            HandlerKind::KnowledgeBase => &self.knowledge_base,
            HandlerKind::LiveSearch => &self.live_search,
            HandlerKind::StructuredData => &self.structured_data,
        }
    }

    /// Never fails: handler errors and panics become confidence-0.0 responses.
    pub async fn route(&self, query: &Query) -> RoutedResult {
        let decision = classify(&query.text);
        tracing::info!("Routing to {} ({})", decision.handler, decision.reason());

        let response = self.invoke(decision.handler, query).await;
        let threshold = self.escalation_threshold(query);

        let Some(fallback) = self
            .policy
            .fallback_for(decision.handler, response.confidence(), threshold)
        else {
            return RoutedResult {
                response,
                handler_used: decision.handler.as_str().to_string(),
                decision,
                escalation: None,
            };
        };

        tracing::info!(
            "Escalating {} -> {} (confidence {:.2} < {:.2})",
            decision.handler,
            fallback,
            response.confidence(),
            threshold
        );
        let record = EscalationRecord {
            from: decision.handler,
            to: fallback,
            primary_confidence: response.confidence(),
        };
        let fallback_response = self.invoke(fallback, query).await;

        RoutedResult {
            response: fallback_response,
            handler_used: format!("{}_fallback", decision.handler.as_str()),
            decision,
            escalation: Some(record),
        }
    }

    fn escalation_threshold(&self, query: &Query) -> f32 {
        match query.context.escalation_threshold() {
            Ok(Some(threshold)) => threshold,
            Ok(None) => self.policy.threshold,
            Err(err) => {
                tracing::warn!("Ignoring escalation override: {}", err);
                self.policy.threshold
            }
        }
    }

    async fn invoke(&self, kind: HandlerKind, query: &Query) -> HandlerResponse {
        let handler = self.handler(kind);
        match AssertUnwindSafe(handler.process(query)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                tracing::warn!("Handler {} failed: {}", kind, err);
                failure_response(&err)
            }
            Err(_) => {
                tracing::error!("Handler {} panicked", kind);
                HandlerResponse::failure(INTERNAL_FAILURE_REPLY)
            }
        }
    }
}

fn failure_response(err: &HandlerError) -> HandlerResponse {
    match err {
        HandlerError::Capability(err) => HandlerResponse::failure(format!(
            "The {} service is unavailable right now ({}). Please try again later.",
            err.capability, err.kind
        )),
        HandlerError::InvalidContext { key, .. } => HandlerResponse::failure(format!(
            "The request option '{}' has an invalid value.",
            key
        )),
        HandlerError::Internal(_) => HandlerResponse::failure(INTERNAL_FAILURE_REPLY),
    }
}
