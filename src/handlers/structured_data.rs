use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use super::{HandlerError, HandlerKind, HandlerResponse, Query, ResponseHandler, ToolInvocation};
use crate::capability::DataCapability;
use crate::text::{title_case, tokenize};

/// Topic-anchored patterns, tried in order against the lower-cased query.
const TOPIC_PATTERNS: &[&str] = &[
    r"\btempo (?:em|de|do|da|no|na) ([\w\s]+)",
    r"\bclima (?:em|de|do|da|no|na) ([\w\s]+)",
    r"\btemperatura (?:em|de|do|da|no|na) ([\w\s]+)",
    r"\b(?:weather|temperature|forecast|climate) (?:in|at|for|of) ([\w\s]+)",
];
const PORTUGUESE_FALLBACK: &str = r"\b(?:em|de|do|da|no|na) ([\w\s]+)";
const ENGLISH_FALLBACK: &str = r"\b(?:in|at) ([\w\s]+)";

/// Topic words that put the English fallback ahead of the Portuguese one.
const ENGLISH_TOPICS: &[&str] = &["weather", "temperature", "forecast", "climate"];

const FILLER_WORDS: &[&str] = &[
    "tempo", "clima", "como", "está", "esta", "é", "tá", "hoje", "agora", "amanhã",
    "previsão", "previsao", "temperatura", "weather", "climate", "today", "now",
    "tomorrow", "forecast", "temperature", "like", "right",
];

/// A capture keeps only the words after the last of these.
const LOCATIVES: &[&str] = &["em", "no", "na", "in", "at", "para", "for"];

const ANSWER_CONFIDENCE: f32 = 0.9;
const CLARIFY_CONFIDENCE: f32 = 0.2;
const CLARIFY_REPLY: &str = "Please tell me which city you want the weather for. \
                             Example: \"What's the weather in São Paulo?\"";

pub struct LocationExtractor {
    topic: Vec<Regex>,
    portuguese: Regex,
    english: Regex,
}

impl LocationExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let topic = TOPIC_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            topic,
            portuguese: Regex::new(PORTUGUESE_FALLBACK)?,
            english: Regex::new(ENGLISH_FALLBACK)?,
        })
    }

    /// Title-cased location, or `None` when no pattern yields a place name.
    ///
    /// Topic patterns go first, then the bare preposition fallbacks. The
    /// English fallback leads when the query uses an English topic word.
    pub fn extract(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        let english_topic = tokenize(&lowered)
            .iter()
            .any(|token| ENGLISH_TOPICS.contains(&token.as_str()));
        let fallbacks = if english_topic {
            [&self.english, &self.portuguese]
        } else {
            [&self.portuguese, &self.english]
        };

        self.topic.iter().chain(fallbacks).find_map(|pattern| {
            let captured = pattern.captures(&lowered)?.get(1)?.as_str();
            place_name(captured)
        })
    }
}

fn place_name(captured: &str) -> Option<String> {
    let words: Vec<&str> = captured
        .split_whitespace()
        .filter(|word| !FILLER_WORDS.contains(word))
        .collect();
    let start = words
        .iter()
        .rposition(|word| LOCATIVES.contains(word))
        .map_or(0, |index| index + 1);

    match &words[start..] {
        [] => None,
        place => Some(title_case(&place.join(" "))),
    }
}

/// Weather lookups for a location named in free text.
pub struct StructuredDataHandler {
    weather: Arc<dyn DataCapability>,
    extractor: LocationExtractor,
}

impl StructuredDataHandler {
    pub fn new(weather: Arc<dyn DataCapability>) -> Result<Self, regex::Error> {
        Ok(Self {
            weather,
            extractor: LocationExtractor::new()?,
        })
    }
}

#[async_trait]
impl ResponseHandler for StructuredDataHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::StructuredData
    }

    async fn process(&self, query: &Query) -> Result<HandlerResponse, HandlerError> {
        let Some(city) = self.extractor.extract(&query.text) else {
            return Ok(HandlerResponse::new(CLARIFY_REPLY, CLARIFY_CONFIDENCE));
        };

        tracing::debug!("Extracted location '{}'", city);
        let parameters = json!({ "city": city });
        let report = self.weather.invoke(&parameters).await?;

        Ok(HandlerResponse::new(report.clone(), ANSWER_CONFIDENCE)
            .with_tool_invocation(ToolInvocation::new(self.weather.name(), parameters))
            .with_context_docs(vec![report]))
    }
}
