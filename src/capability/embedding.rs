use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::send_checked;
use super::{build_http_client, CapabilityError, EmbeddingCapability, EMBEDDING};
use crate::core::config::{EmbeddingProvider, EmbeddingSettings};
use crate::text::tokenize;

/// Embedding service speaking the OpenAI `/v1/embeddings` protocol
/// (LM Studio, llama.cpp server, text-embeddings-inference, OpenAI).
pub struct OpenAiCompatibleEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAiCompatibleEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: build_http_client(EMBEDDING, settings.timeout_secs)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            dimension: settings.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingCapability for OpenAiCompatibleEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = send_checked(EMBEDDING, request).await?;
        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| CapabilityError::from_reqwest(EMBEDDING, err))?;

        order_embeddings(payload.data, texts.len())
    }
}

/// Restores input order when the service reports indices, and checks that
/// every input got exactly one vector.
fn order_embeddings(
    mut items: Vec<EmbeddingItem>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, CapabilityError> {
    if items.len() != expected {
        return Err(CapabilityError::invalid_response(
            EMBEDDING,
            format!("expected {} embeddings, got {}", expected, items.len()),
        ));
    }
    if items.iter().all(|item| item.index.is_some()) {
        items.sort_by_key(|item| item.index.unwrap_or(usize::MAX));
    }
    Ok(items.into_iter().map(|item| item.embedding).collect())
}

/// Offline embedder: hashes word tokens and character trigrams into a fixed
/// number of buckets, then L2-normalises.
///
/// Deterministic and non-negative, so cosine similarity between two outputs
/// always lies in `[0, 1]` and is positive whenever the texts share a token.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            vector[self.bucket(&format!("w:{}", token))] += WORD_WEIGHT;

            let padded: Vec<char> = format!(" {} ", token).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(&format!("c:{}", trigram))] += TRIGRAM_WEIGHT;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in vector.iter_mut() {
                *value /= norm;
            }
        }
        vector
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dimension as u64) as usize
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

#[async_trait]
impl EmbeddingCapability for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

pub fn create_embedder(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingCapability>, CapabilityError> {
    match settings.provider {
        EmbeddingProvider::OpenaiCompatible => {
            tracing::info!(
                "Embedding: OpenAI-compatible endpoint {} (model={})",
                settings.base_url,
                settings.model
            );
            Ok(Arc::new(OpenAiCompatibleEmbedder::new(settings)?))
        }
        EmbeddingProvider::Hashing => {
            tracing::info!("Embedding: local hashing embedder (dim={})", settings.dimension);
            Ok(Arc::new(HashingEmbedder::new(settings.dimension)))
        }
    }
}
