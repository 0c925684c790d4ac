use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::send_checked;
use super::{build_http_client, CapabilityError, GenerationCapability, TEXT_GENERATION};
use crate::core::config::{GenerationProvider, GenerationSettings};

const SYSTEM_PROMPT: &str = "Answer the user's question using only the provided context. \
If the context does not contain the answer, say so briefly.";

/// Client for the self-hosted LLM service (`GET /health`, `POST /generate`).
pub struct LlmServiceGenerator {
    client: Client,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    health_timeout: Duration,
    ready: AtomicBool,
}

#[derive(Deserialize)]
struct HealthResponse {
    #[serde(default)]
    model_loaded: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmServiceGenerator {
    pub fn new(settings: &GenerationSettings) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: build_http_client(TEXT_GENERATION, settings.timeout_secs)?,
            base_url: settings.url.trim_end_matches('/').to_string(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            health_timeout: Duration::from_secs(settings.health_timeout_secs),
            ready: AtomicBool::new(false),
        })
    }

    async fn probe(&self) -> Result<bool, CapabilityError> {
        let url = format!("{}/health", self.base_url);
        let request = self.client.get(&url).timeout(self.health_timeout);
        let response = send_checked(TEXT_GENERATION, request).await?;
        let health: HealthResponse = response
            .json()
            .await
            .map_err(|err| CapabilityError::from_reqwest(TEXT_GENERATION, err))?;
        Ok(health.model_loaded)
    }
}

#[async_trait]
impl GenerationCapability for LlmServiceGenerator {
    fn name(&self) -> &str {
        "llm_service"
    }

    /// Once the service has reported a loaded model, later calls skip the probe.
    async fn is_available(&self) -> bool {
        if self.ready.load(Ordering::Relaxed) {
            return true;
        }
        match self.probe().await {
            Ok(true) => {
                tracing::info!("LLM service ready at {}", self.base_url);
                self.ready.store(true, Ordering::Relaxed);
                true
            }
            Ok(false) => {
                tracing::info!("LLM service reachable but still loading its model");
                false
            }
            Err(err) => {
                tracing::warn!("LLM service not available: {}", err);
                false
            }
        }
    }

    async fn generate(&self, query: &str, context: &str) -> Result<String, CapabilityError> {
        let url = format!("{}/generate", self.base_url);
        let request = self.client.post(&url).json(&json!({
            "query": query,
            "context": context,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        }));

        let response = send_checked(TEXT_GENERATION, request).await.map_err(|err| {
            self.ready.store(false, Ordering::Relaxed);
            err
        })?;
        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|err| CapabilityError::from_reqwest(TEXT_GENERATION, err))?;

        Ok(payload.response.trim().to_string())
    }
}

/// Chat-completions backend (LM Studio, llama.cpp server, OpenAI).
pub struct OpenAiCompatibleGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    health_timeout: Duration,
}

impl OpenAiCompatibleGenerator {
    pub fn new(settings: &GenerationSettings) -> Result<Self, CapabilityError> {
        let model = settings
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                CapabilityError::not_configured(TEXT_GENERATION, "generation.model is required")
            })?;

        Ok(Self {
            client: build_http_client(TEXT_GENERATION, settings.timeout_secs)?,
            base_url: settings.url.trim_end_matches('/').to_string(),
            model,
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            health_timeout: Duration::from_secs(settings.health_timeout_secs),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl GenerationCapability for OpenAiCompatibleGenerator {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        let request = self.authorized(self.client.get(&url).timeout(self.health_timeout));
        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                tracing::warn!("Chat completions endpoint not available: {}", err);
                false
            }
        }
    }

    async fn generate(&self, query: &str, context: &str) -> Result<String, CapabilityError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let system = format!("{}\n\nContext:\n{}", SYSTEM_PROMPT, context);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": query },
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": false,
        });

        let request = self.authorized(self.client.post(&url).json(&body));
        let response = send_checked(TEXT_GENERATION, request).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|err| CapabilityError::from_reqwest(TEXT_GENERATION, err))?;

        extract_chat_content(&payload)
    }
}

fn extract_chat_content(payload: &Value) -> Result<String, CapabilityError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| {
            CapabilityError::invalid_response(TEXT_GENERATION, "chat completion without content")
        })
}

/// Generation turned off in config; callers always take the raw-context path.
pub struct DisabledGenerator;

#[async_trait]
impl GenerationCapability for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn generate(&self, _query: &str, _context: &str) -> Result<String, CapabilityError> {
        Err(CapabilityError::not_configured(
            TEXT_GENERATION,
            "text generation is disabled",
        ))
    }
}

pub fn create_generator(
    settings: &GenerationSettings,
) -> Result<Arc<dyn GenerationCapability>, CapabilityError> {
    match settings.provider {
        GenerationProvider::LlmService => {
            tracing::info!("Generation: LLM service at {}", settings.url);
            Ok(Arc::new(LlmServiceGenerator::new(settings)?))
        }
        GenerationProvider::OpenaiCompatible => {
            tracing::info!(
                "Generation: OpenAI-compatible endpoint {} (model={})",
                settings.url,
                settings.model.as_deref().unwrap_or("-")
            );
            Ok(Arc::new(OpenAiCompatibleGenerator::new(settings)?))
        }
        GenerationProvider::Disabled => {
            tracing::info!("Generation: disabled");
            Ok(Arc::new(DisabledGenerator))
        }
    }
}
