//! Post-hoc quality and safety scoring of a (query, response, context) triple.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityError, EmbeddingCapability, EMBEDDING};
use crate::vector_math::{clamp_unit, cosine_similarity, max_cosine};

pub mod safety;

pub use safety::SafetyScanner;

const SIMILARITY_WEIGHT: f32 = 0.3;
const SAFETY_WEIGHT: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub context_relevance: f32,
    pub answer_relevance: f32,
    pub groundedness: f32,
    pub pii_detected: bool,
    pub jailbreak_detected: bool,
    pub overall_score: f32,
}

impl EvaluationMetrics {
    /// Clamps the similarity inputs and derives `overall_score`.
    ///
    /// The two safety terms are bonuses for the absence of a detection, so the
    /// weights only sum to 1.0 when neither flag fires.
    pub fn from_parts(
        context_relevance: f32,
        answer_relevance: f32,
        groundedness: f32,
        pii_detected: bool,
        jailbreak_detected: bool,
    ) -> Self {
        let context_relevance = clamp_unit(context_relevance);
        let answer_relevance = clamp_unit(answer_relevance);
        let groundedness = clamp_unit(groundedness);

        let bonus = |flag: bool| if flag { 0.0 } else { SAFETY_WEIGHT };
        let overall_score = clamp_unit(
            SIMILARITY_WEIGHT * context_relevance
                + SIMILARITY_WEIGHT * answer_relevance
                + SIMILARITY_WEIGHT * groundedness
                + bonus(pii_detected)
                + bonus(jailbreak_detected),
        );

        Self {
            context_relevance,
            answer_relevance,
            groundedness,
            pii_detected,
            jailbreak_detected,
            overall_score,
        }
    }
}

pub struct ResponseEvaluator {
    embedder: Arc<dyn EmbeddingCapability>,
    safety: SafetyScanner,
}

impl ResponseEvaluator {
    pub fn new(embedder: Arc<dyn EmbeddingCapability>) -> Result<Self, regex::Error> {
        Ok(Self {
            embedder,
            safety: SafetyScanner::new()?,
        })
    }

    /// Embedding failures are returned, never folded into zero scores.
    pub async fn evaluate(
        &self,
        query: &str,
        response: &str,
        context_docs: &[String],
    ) -> Result<EvaluationMetrics, CapabilityError> {
        let has_response = !response.trim().is_empty();
        let docs: Vec<&String> = context_docs.iter().filter(|d| !d.trim().is_empty()).collect();

        // One batch: query, then the response if present, then the documents.
        let mut inputs = Vec::with_capacity(2 + docs.len());
        inputs.push(query.to_string());
        if has_response {
            inputs.push(response.to_string());
        }
        inputs.extend(docs.iter().map(|d| d.to_string()));

        let mut vectors = self.embedder.embed_batch(&inputs).await?;
        if vectors.len() != inputs.len() {
            return Err(CapabilityError::invalid_response(
                EMBEDDING,
                format!("expected {} embeddings, got {}", inputs.len(), vectors.len()),
            ));
        }
        let expected_dim = vectors[0].len();
        if vectors.iter().any(|v| v.len() != expected_dim) {
            return Err(CapabilityError::invalid_response(
                EMBEDDING,
                "embeddings have inconsistent dimensions",
            ));
        }

        let doc_vectors = vectors.split_off(if has_response { 2 } else { 1 });
        let query_vector = &vectors[0];
        let response_vector = vectors.get(1);

        let context_relevance = max_cosine(query_vector, &doc_vectors);
        let (answer_relevance, groundedness) = match response_vector {
            Some(r) => (cosine_similarity(query_vector, r), max_cosine(r, &doc_vectors)),
            None => (0.0, 0.0),
        };

        let metrics = EvaluationMetrics::from_parts(
            context_relevance,
            answer_relevance,
            groundedness,
            self.safety.contains_pii(response),
            self.safety.is_jailbreak_attempt(query),
        );

        tracing::debug!(
            "Evaluation: context_relevance={:.3} answer_relevance={:.3} groundedness={:.3} \
             pii={} jailbreak={} overall={:.3}",
            metrics.context_relevance,
            metrics.answer_relevance,
            metrics.groundedness,
            metrics.pii_detected,
            metrics.jailbreak_detected,
            metrics.overall_score
        );
        Ok(metrics)
    }
}
