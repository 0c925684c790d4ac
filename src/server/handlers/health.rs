use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Probes the generation service and reports the active providers.
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let generation_available = state.generator.is_available().await;
    let settings = &state.settings;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0);
    let weather_configured = settings
        .weather
        .api_key
        .as_deref()
        .is_some_and(|key| !key.trim().is_empty());

    Json(json!({
        "status": if generation_available { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": uptime_secs,
        "generation": {
            "provider": settings.generation.provider,
            "backend": state.generator.name(),
            "available": generation_available,
        },
        "embedding": {
            "provider": settings.embedding.provider,
            "model": settings.embedding.model,
        },
        "vector_store": {
            "url": settings.vector_store.url,
            "collection": settings.vector_store.collection,
        },
        "web_search": { "provider": settings.web_search.provider },
        "weather": { "configured": weather_configured },
        "routing": {
            "escalation_threshold": state.pipeline.router().policy().threshold,
            "fallback_handler": state.pipeline.router().policy().fallback,
        },
    }))
}
