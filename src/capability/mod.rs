//! Capability ports: the narrow contracts the core uses to reach external
//! services (embedding, vector retrieval, text generation, domain data).
//!
//! Handlers and the evaluator hold `Arc<dyn …>` references to the specific
//! capabilities they need; nothing is looked up by name at runtime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod embedding;
pub mod error;
pub mod generation;
pub mod retrieval;
pub mod weather;
pub mod web_search;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use embedding::{create_embedder, HashingEmbedder, OpenAiCompatibleEmbedder};
pub use error::{CapabilityError, CapabilityErrorKind};
pub use generation::{
    create_generator, DisabledGenerator, LlmServiceGenerator, OpenAiCompatibleGenerator,
};
pub use retrieval::QdrantRetriever;
pub use weather::OpenWeatherClient;
pub use web_search::WebSearchClient;

pub const EMBEDDING: &str = "embedding";
pub const VECTOR_SEARCH: &str = "vector_search";
pub const TEXT_GENERATION: &str = "text_generation";
pub const WEATHER_QUERY: &str = "weather_query";
pub const WEB_SEARCH: &str = "web_search";

/// Most results a single web search returns.
pub const MAX_SEARCH_RESULTS: usize = 10;

#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| CapabilityError::invalid_response(EMBEDDING, "empty embedding batch"))
    }
}

/// A nearest-neighbour hit from the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub text: String,
    /// Similarity in `[0, 1]`.
    pub score: f32,
    pub metadata: Value,
}

#[async_trait]
pub trait RetrievalCapability: Send + Sync {
    /// Hits scoring at least `score_threshold`, highest score first, at most `k`.
    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedDocument>, CapabilityError>;
}

#[async_trait]
pub trait GenerationCapability: Send + Sync {
    fn name(&self) -> &str;

    /// Health-check style probe. Callers must degrade gracefully when false.
    async fn is_available(&self) -> bool;

    async fn generate(&self, query: &str, context: &str) -> Result<String, CapabilityError>;
}

/// Weather lookup, web search and similar "parameters in, text out" services.
#[async_trait]
pub trait DataCapability: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke(&self, parameters: &Value) -> Result<String, CapabilityError>;
}

/// Reads a required, non-blank string parameter.
pub(crate) fn required_str<'a>(
    capability: &'static str,
    parameters: &'a Value,
    key: &str,
) -> Result<&'a str, CapabilityError> {
    parameters
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            CapabilityError::rejected(capability, format!("missing '{}' parameter", key))
        })
}

pub(crate) fn build_http_client(
    capability: &'static str,
    timeout_secs: u64,
) -> Result<reqwest::Client, CapabilityError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|err| CapabilityError::from_reqwest(capability, err))
}
