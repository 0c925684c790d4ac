use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::HandlerError;

pub const MAX_RESULTS_KEY: &str = "max_results";
pub const CONFIDENCE_THRESHOLD_KEY: &str = "confidence_threshold";
pub const ESCALATION_THRESHOLD_KEY: &str = "escalation_threshold";

const MAX_RESULTS_LIMIT: u64 = 50;

/// Tunable per-request parameters passed from the caller to the handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryContext(Map<String, Value>);

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Result count for retrieval and web search, in `1..=50`.
    pub fn max_results(&self) -> Result<Option<usize>, HandlerError> {
        let Some(value) = self.get(MAX_RESULTS_KEY) else {
            return Ok(None);
        };
        match value.as_u64() {
            Some(n) if (1..=MAX_RESULTS_LIMIT).contains(&n) => Ok(Some(n as usize)),
            _ => Err(HandlerError::invalid_context(
                MAX_RESULTS_KEY,
                format!("expected an integer between 1 and {}, got {}", MAX_RESULTS_LIMIT, value),
            )),
        }
    }

    /// Minimum retrieval score.
    pub fn score_threshold(&self) -> Result<Option<f32>, HandlerError> {
        self.unit_interval(CONFIDENCE_THRESHOLD_KEY)
    }

    pub fn escalation_threshold(&self) -> Result<Option<f32>, HandlerError> {
        self.unit_interval(ESCALATION_THRESHOLD_KEY)
    }

    fn unit_interval(&self, key: &'static str) -> Result<Option<f32>, HandlerError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.as_f64() {
            Some(v) if (0.0..=1.0).contains(&v) => Ok(Some(v as f32)),
            _ => Err(HandlerError::invalid_context(
                key,
                format!("expected a number between 0 and 1, got {}", value),
            )),
        }
    }
}

impl From<Map<String, Value>> for QueryContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub context: QueryContext,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: QueryContext::new(),
        }
    }

    pub fn with_context(text: impl Into<String>, context: QueryContext) -> Self {
        Self {
            text: text.into(),
            context,
        }
    }
}

/// One capability call made while producing a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub capability: String,
    pub parameters: Value,
}

impl ToolInvocation {
    pub fn new(capability: impl Into<String>, parameters: Value) -> Self {
        Self {
            capability: capability.into(),
            parameters,
        }
    }
}

/// Output of a single handler invocation.
///
/// Fields are read-only once built; the builder methods consume `self`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    content: String,
    tool_invocations: Vec<ToolInvocation>,
    confidence: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    context_docs: Vec<String>,
}

impl HandlerResponse {
    /// `confidence` is clamped to `[0, 1]`; NaN becomes 0.
    pub fn new(content: impl Into<String>, confidence: f32) -> Self {
        Self {
            content: content.into(),
            tool_invocations: Vec::new(),
            confidence: crate::vector_math::clamp_unit(confidence),
            context_docs: Vec::new(),
        }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        Self::new(content, 0.0)
    }

    pub fn with_tool_invocation(mut self, invocation: ToolInvocation) -> Self {
        self.tool_invocations.push(invocation);
        self
    }

    pub fn with_context_docs(mut self, docs: Vec<String>) -> Self {
        self.context_docs = docs;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn tool_invocations(&self) -> &[ToolInvocation] {
        &self.tool_invocations
    }

    /// Snippets the content is grounded on.
    pub fn context_docs(&self) -> &[String] {
        &self.context_docs
    }
}
