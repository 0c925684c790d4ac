//! In-memory capability doubles for unit and integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    CapabilityError, DataCapability, EmbeddingCapability, GenerationCapability,
    RetrievalCapability, RetrievedDocument, EMBEDDING, VECTOR_SEARCH,
};

/// Embedder that always fails with `Unavailable`.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingCapability for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        0
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        Err(CapabilityError::unavailable(EMBEDDING, "embedding service offline"))
    }
}

/// Returns a fixed document list, filtered and capped like a real store.
pub struct StaticRetriever {
    documents: Vec<RetrievedDocument>,
    failure: Option<CapabilityError>,
    calls: Mutex<Vec<(usize, f32)>>,
}

impl StaticRetriever {
    pub fn new(documents: Vec<RetrievedDocument>) -> Self {
        Self {
            documents,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_texts(hits: &[(&str, f32)]) -> Self {
        Self::new(
            hits.iter()
                .map(|(text, score)| RetrievedDocument {
                    text: text.to_string(),
                    score: *score,
                    metadata: Value::Null,
                })
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            documents: Vec::new(),
            failure: Some(CapabilityError::unavailable(VECTOR_SEARCH, "connection refused")),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(k, score_threshold)` for every search call, in order.
    pub fn calls(&self) -> Vec<(usize, f32)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RetrievalCapability for StaticRetriever {
    async fn search(
        &self,
        _query_vector: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedDocument>, CapabilityError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((k, score_threshold));
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let mut hits: Vec<RetrievedDocument> = self
            .documents
            .iter()
            .filter(|doc| doc.score >= score_threshold)
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

/// Generator with a fixed availability flag and a fixed reply.
pub struct ScriptedGenerator {
    available: bool,
    reply: Result<String, CapabilityError>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            available: true,
            reply: Ok(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            reply: Err(CapabilityError::unavailable(
                super::TEXT_GENERATION,
                "model not loaded",
            )),
            calls: AtomicUsize::new(0),
        }
    }

    /// Reports available but errors on every generate call.
    pub fn failing() -> Self {
        Self {
            available: true,
            reply: Err(CapabilityError::unavailable(
                super::TEXT_GENERATION,
                "HTTP 500 Internal Server Error",
            )),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn generate_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationCapability for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, _query: &str, _context: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

/// Data capability that records its parameters and returns a fixed result.
pub struct ScriptedData {
    name: &'static str,
    reply: Result<String, CapabilityError>,
    calls: Mutex<Vec<Value>>,
}

impl ScriptedData {
    pub fn ok(name: &'static str, text: impl Into<String>) -> Self {
        Self {
            name,
            reply: Ok(text.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn err(name: &'static str, error: CapabilityError) -> Self {
        Self {
            name,
            reply: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DataCapability for ScriptedData {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, parameters: &Value) -> Result<String, CapabilityError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(parameters.clone());
        }
        self.reply.clone()
    }
}
