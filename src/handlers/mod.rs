//! Response handlers: the closed set of strategies the router dispatches to.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::CapabilityError;

pub mod knowledge_base;
pub mod live_search;
pub mod structured_data;
pub mod types;

pub use knowledge_base::KnowledgeBaseHandler;
pub use live_search::LiveSearchHandler;
pub use structured_data::{LocationExtractor, StructuredDataHandler};
pub use types::{HandlerResponse, Query, QueryContext, ToolInvocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    KnowledgeBase,
    LiveSearch,
    StructuredData,
}

impl HandlerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::KnowledgeBase => "knowledge_base",
            HandlerKind::LiveSearch => "live_search",
            HandlerKind::StructuredData => "structured_data",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("invalid context value '{key}': {message}")]
    InvalidContext { key: String, message: String },

    #[error("internal handler failure: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn invalid_context(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidContext {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ResponseHandler: Send + Sync {
    fn kind(&self) -> HandlerKind;

    /// Produces exactly one response per call. Must not keep per-query state
    /// on `self`; handlers are shared across concurrent requests.
    async fn process(&self, query: &Query) -> Result<HandlerResponse, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_kind_uses_snake_case_names() {
        assert_eq!(HandlerKind::LiveSearch.as_str(), "live_search");
        assert_eq!(
            serde_json::to_value(HandlerKind::StructuredData).expect("serialize"),
            serde_json::json!("structured_data")
        );
        let parsed: HandlerKind = serde_json::from_str("\"knowledge_base\"").expect("parse");
        assert_eq!(parsed, HandlerKind::KnowledgeBase);
    }
}
