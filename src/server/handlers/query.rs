use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::pipeline::{AssistantReply, RequestConfig};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub config: RequestConfig,
}

pub async fn post_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<AssistantReply>, ApiError> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let max_len = state.settings.server.max_input_length;
    if query.chars().count() > max_len {
        return Err(ApiError::BadRequest(format!(
            "query exceeds {} characters",
            max_len
        )));
    }

    let reply = state.pipeline.handle_request(query, &payload.config).await;
    tracing::info!(
        "Answered via {} (confidence {:.2}, overall {})",
        reply.handler_used,
        reply.confidence,
        reply
            .evaluation_metrics
            .map(|m| format!("{:.3}", m.overall_score))
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(Json(reply))
}
