mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use rag_assistant::core::config::{AppPaths, ConfigService, Settings};
use rag_assistant::server::router::router;
use rag_assistant::state::AppState;
use rag_assistant::AssistantReply;

use common::HarnessBuilder;

fn app(dir: &tempfile::TempDir, settings: Settings) -> Router {
    let paths = Arc::new(AppPaths::with_dirs(
        dir.path().to_path_buf(),
        dir.path().to_path_buf(),
    ));
    let config = ConfigService::new(paths.clone());
    let harness = HarnessBuilder::new().settings(settings.clone()).build();
    let state = AppState::from_parts(paths, config, settings, harness.capabilities).expect("state");
    router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (status, body) = send(app(&dir, Settings::default()), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_reports_generation_availability() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (status, body) = send(app(&dir, Settings::default()), get("/api/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"]["available"], true);
    assert_eq!(body["generation"]["backend"], "scripted");
    assert_eq!(body["routing"]["fallback_handler"], "live_search");
}

#[tokio::test]
async fn query_endpoint_returns_a_scored_reply() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (status, body) = send(
        app(&dir, Settings::default()),
        post_json("/api/query", json!({ "query": "What is AI?", "config": { "max_results": 2 } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let reply: AssistantReply = serde_json::from_value(body).expect("reply");
    assert_eq!(reply.handler_used, "knowledge_base");
    assert_eq!(reply.tool_invocations[0].parameters["k"], 2);
    assert!(reply.evaluation_metrics.is_some());
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (status, body) = send(
        app(&dir, Settings::default()),
        post_json("/api/query", json!({ "query": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "query must not be empty");
}

#[tokio::test]
async fn oversized_query_is_a_bad_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = Settings::default();
    settings.server.max_input_length = 10;

    let (status, _) = send(
        app(&dir, settings),
        post_json("/api/query", json!({ "query": "What is retrieval augmented generation?" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn config_endpoint_masks_secrets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = Settings::default();
    settings.weather.api_key = Some("owm-secret".to_string());

    let (status, body) = send(app(&dir, settings), get("/api/config")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weather"]["api_key"], "****");
    assert_eq!(body["vector_store"]["api_key"], Value::Null);
    assert_eq!(body["generation"]["max_tokens"], 256);
}
