use super::error::ConfigError;
use super::settings::{EmbeddingProvider, GenerationProvider, Settings};

const MAX_RESULTS_RANGE: (usize, usize) = (1, 50);
const TIMEOUT_RANGE_SECS: (u64, u64) = (1, 600);

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    validate_unit_interval(
        "routing.escalation_threshold",
        settings.routing.escalation_threshold,
    )?;
    validate_unit_interval(
        "knowledge_base.score_threshold",
        settings.knowledge_base.score_threshold,
    )?;

    validate_count("knowledge_base.max_results", settings.knowledge_base.max_results)?;
    validate_count("live_search.max_results", settings.live_search.max_results)?;

    if settings.server.max_input_length == 0 {
        return Err(ConfigError::invalid(
            "server.max_input_length",
            "must be greater than zero",
        ));
    }

    validate_timeout("embedding.timeout_secs", settings.embedding.timeout_secs)?;
    validate_timeout("vector_store.timeout_secs", settings.vector_store.timeout_secs)?;
    validate_timeout("generation.timeout_secs", settings.generation.timeout_secs)?;
    validate_timeout(
        "generation.health_timeout_secs",
        settings.generation.health_timeout_secs,
    )?;
    validate_timeout("weather.timeout_secs", settings.weather.timeout_secs)?;
    validate_timeout("web_search.timeout_secs", settings.web_search.timeout_secs)?;

    if settings.embedding.dimension == 0 {
        return Err(ConfigError::invalid("embedding.dimension", "must be greater than zero"));
    }
    if settings.embedding.provider == EmbeddingProvider::OpenaiCompatible {
        validate_url("embedding.base_url", &settings.embedding.base_url)?;
    }
    validate_url("vector_store.url", &settings.vector_store.url)?;
    if settings.generation.provider != GenerationProvider::Disabled {
        validate_url("generation.url", &settings.generation.url)?;
    }
    validate_url("weather.base_url", &settings.weather.base_url)?;

    if !(0.0..=2.0).contains(&settings.generation.temperature) {
        return Err(ConfigError::invalid(
            "generation.temperature",
            format!("{} is outside 0.0..=2.0", settings.generation.temperature),
        ));
    }

    Ok(())
}

fn validate_unit_interval(key: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::invalid(key, format!("{} is outside 0.0..=1.0", value)))
}

fn validate_count(key: &str, value: usize) -> Result<(), ConfigError> {
    let (min, max) = MAX_RESULTS_RANGE;
    if (min..=max).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::invalid(key, format!("{} is outside {}..={}", value, min, max)))
}

fn validate_timeout(key: &str, value: u64) -> Result<(), ConfigError> {
    let (min, max) = TIMEOUT_RANGE_SECS;
    if (min..=max).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::invalid(key, format!("{}s is outside {}..={}s", value, min, max)))
}

fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(());
    }
    Err(ConfigError::invalid(key, format!("'{}' is not an http(s) URL", value)))
}
