//! Knowledge-base retrieval over the Qdrant REST API.

use std::cmp::Ordering;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::error::send_checked;
use super::{
    build_http_client, CapabilityError, RetrievalCapability, RetrievedDocument, VECTOR_SEARCH,
};
use crate::core::config::VectorStoreSettings;
use crate::vector_math::clamp_unit;

pub struct QdrantRetriever {
    client: Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

impl QdrantRetriever {
    pub fn new(settings: &VectorStoreSettings) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: build_http_client(VECTOR_SEARCH, settings.timeout_secs)?,
            base_url: settings.url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }
}

#[async_trait]
impl RetrievalCapability for QdrantRetriever {
    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedDocument>, CapabilityError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url,
            urlencoding::encode(&self.collection)
        );
        let body = json!({
            "vector": query_vector,
            "limit": k,
            "score_threshold": score_threshold,
            "with_payload": true,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = send_checked(VECTOR_SEARCH, request).await?;
        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|err| CapabilityError::from_reqwest(VECTOR_SEARCH, err))?;

        let documents = into_documents(payload.result, k, score_threshold);
        tracing::debug!(
            "Vector search: collection={}, k={}, threshold={}, hits={}",
            self.collection,
            k,
            score_threshold,
            documents.len()
        );
        Ok(documents)
    }
}

/// Payload `text` becomes the snippet and the remaining payload keys become
/// metadata. Points without text are dropped.
fn into_documents(
    points: Vec<ScoredPoint>,
    k: usize,
    score_threshold: f32,
) -> Vec<RetrievedDocument> {
    let mut documents: Vec<RetrievedDocument> = points
        .into_iter()
        .filter(|point| point.score >= score_threshold)
        .filter_map(|point| {
            let mut payload = point.payload.unwrap_or_default();
            let text = match payload.remove("text") {
                Some(Value::String(text)) if !text.trim().is_empty() => text,
                _ => return None,
            };
            Some(RetrievedDocument {
                text,
                score: clamp_unit(point.score),
                metadata: Value::Object(payload),
            })
        })
        .collect();

    documents.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    documents.truncate(k);
    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(score: f32, payload: Value) -> ScoredPoint {
        ScoredPoint {
            score,
            payload: payload.as_object().cloned(),
        }
    }

    #[test]
    fn documents_are_sorted_and_split_from_metadata() {
        let points = vec![
            point(0.41, json!({ "text": "second", "source": "b.md" })),
            point(0.87, json!({ "text": "first", "source": "a.md" })),
        ];

        let docs = into_documents(points, 3, 0.3);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "first");
        assert_eq!(docs[0].metadata, json!({ "source": "a.md" }));
        assert_eq!(docs[1].text, "second");
    }

    #[test]
    fn below_threshold_and_textless_points_are_dropped() {
        let points = vec![
            point(0.2, json!({ "text": "weak" })),
            point(0.9, json!({ "title": "no text" })),
            point(0.5, json!({ "text": "kept" })),
        ];

        let docs = into_documents(points, 5, 0.3);

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "kept");
    }

    #[test]
    fn results_are_capped_at_k() {
        let points = (0..6)
            .map(|i| point(0.5 + i as f32 * 0.05, json!({ "text": format!("doc {}", i) })))
            .collect();

        let docs = into_documents(points, 3, 0.0);

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].text, "doc 5");
    }

    #[test]
    fn search_response_tolerates_missing_result() {
        let parsed: SearchResponse =
            serde_json::from_value(json!({ "status": "ok" })).expect("parse");
        assert!(parsed.result.is_empty());
    }
}
