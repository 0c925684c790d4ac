//! Typed view over the merged configuration document.
//!
//! Every section and field is defaulted, so an empty `config.yml` yields a
//! working local setup (hashing embedder aside, which must be opted into).

use serde::{Deserialize, Serialize};

use crate::handlers::HandlerKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub routing: RoutingSettings,
    pub knowledge_base: KnowledgeBaseSettings,
    pub live_search: LiveSearchSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub generation: GenerationSettings,
    pub weather: WeatherSettings,
    pub web_search: WebSearchSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_input_length: usize,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_input_length: 4000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub escalation_threshold: f32,
    pub fallback_handler: HandlerKind,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            escalation_threshold: 0.5,
            fallback_handler: HandlerKind::LiveSearch,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    pub max_results: usize,
    pub score_threshold: f32,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            max_results: 3,
            score_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSearchSettings {
    pub max_results: usize,
}

impl Default for LiveSearchSettings {
    fn default() -> Self {
        Self { max_results: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    OpenaiCompatible,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenaiCompatible,
            base_url: "http://localhost:1234".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            api_key: None,
            dimension: 384,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub url: String,
    pub collection: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "documents".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    LlmService,
    OpenaiCompatible,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: GenerationProvider,
    pub url: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub health_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::LlmService,
            url: "http://llm-service:8000".to_string(),
            model: None,
            api_key: None,
            max_tokens: 256,
            temperature: 0.7,
            health_timeout_secs: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub units: String,
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org".to_string(),
            api_key: None,
            units: "metric".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchProvider {
    Duckduckgo,
    Brave,
    Google,
    Bing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchSettings {
    pub provider: SearchProvider,
    pub brave_search_api_key: Option<String>,
    pub bing_search_api_key: Option<String>,
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            provider: SearchProvider::Duckduckgo,
            brave_search_api_key: None,
            bing_search_api_key: None,
            google_search_api_key: None,
            google_search_engine_id: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_yields_defaults() {
        let settings: Settings = serde_json::from_value(json!({})).expect("defaults");
        assert_eq!(settings.routing.escalation_threshold, 0.5);
        assert_eq!(settings.routing.fallback_handler, HandlerKind::LiveSearch);
        assert_eq!(settings.knowledge_base.max_results, 3);
        assert_eq!(settings.generation.provider, GenerationProvider::LlmService);
        assert_eq!(settings.weather.units, "metric");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings: Settings = serde_json::from_value(json!({
            "routing": { "escalation_threshold": 0.4 },
            "embedding": { "provider": "hashing" },
            "web_search": { "provider": "brave", "brave_search_api_key": "k" }
        }))
        .expect("partial config");

        assert_eq!(settings.routing.escalation_threshold, 0.4);
        assert_eq!(settings.routing.fallback_handler, HandlerKind::LiveSearch);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hashing);
        assert_eq!(settings.embedding.dimension, 384);
        assert_eq!(settings.web_search.provider, SearchProvider::Brave);
        assert_eq!(settings.web_search.timeout_secs, 15);
    }
}
