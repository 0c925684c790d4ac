#![allow(dead_code)]

use std::sync::Arc;

use rag_assistant::capability::mock::{ScriptedData, ScriptedGenerator, StaticRetriever};
use rag_assistant::capability::{EmbeddingCapability, HashingEmbedder, WEATHER_QUERY, WEB_SEARCH};
use rag_assistant::core::config::Settings;
use rag_assistant::{AssistantPipeline, Capabilities};

pub const WEB_RESULTS: &str = "**Rust 1.90 released**\n\
                               The Rust team announced a new release.\n\
                               Source: https://blog.rust-lang.org\n";
pub const WEATHER_REPORT: &str =
    "**Weather in Recife**\n\n- Conditions: Light rain\n- Temperature: 27.0°C";

/// Pipeline wired to the deterministic hashing embedder and scripted
/// services, with handles kept for assertions.
pub struct Harness {
    pub retriever: Arc<StaticRetriever>,
    pub generator: Arc<ScriptedGenerator>,
    pub weather: Arc<ScriptedData>,
    pub web_search: Arc<ScriptedData>,
    pub capabilities: Capabilities,
    pub pipeline: AssistantPipeline,
}

pub struct HarnessBuilder {
    embedder: Arc<dyn EmbeddingCapability>,
    retriever: StaticRetriever,
    generator: ScriptedGenerator,
    weather: ScriptedData,
    web_search: ScriptedData,
    settings: Settings,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            embedder: Arc::new(HashingEmbedder::new(384)),
            retriever: StaticRetriever::from_texts(&[
                ("Artificial intelligence is a technology", 0.82),
                ("Qdrant is a vector database", 0.35),
            ]),
            generator: ScriptedGenerator::replying("AI is artificial intelligence"),
            weather: ScriptedData::ok(WEATHER_QUERY, WEATHER_REPORT),
            web_search: ScriptedData::ok(WEB_SEARCH, WEB_RESULTS),
            settings: Settings::default(),
        }
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingCapability>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn retriever(mut self, retriever: StaticRetriever) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn generator(mut self, generator: ScriptedGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn weather(mut self, weather: ScriptedData) -> Self {
        self.weather = weather;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Harness {
        let retriever = Arc::new(self.retriever);
        let generator = Arc::new(self.generator);
        let weather = Arc::new(self.weather);
        let web_search = Arc::new(self.web_search);

        let capabilities = Capabilities {
            embedder: self.embedder,
            retriever: retriever.clone(),
            generator: generator.clone(),
            weather: weather.clone(),
            web_search: web_search.clone(),
        };
        let pipeline = AssistantPipeline::new(&capabilities, &self.settings).expect("pipeline");

        Harness {
            retriever,
            generator,
            weather,
            web_search,
            capabilities,
            pipeline,
        }
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}
