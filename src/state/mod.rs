use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::capability::GenerationCapability;
use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::pipeline::{AssistantPipeline, Capabilities};

pub mod error;

pub use error::InitializationError;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub pipeline: Arc<AssistantPipeline>,
    pub generator: Arc<dyn GenerationCapability>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds every capability client from `settings` and wires the pipeline.
    pub fn initialize(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: Settings,
    ) -> Result<Arc<Self>, InitializationError> {
        let capabilities = Capabilities::from_settings(&settings)?;
        Self::from_parts(paths, config, settings, capabilities)
    }

    /// Wires state from already-built capabilities.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: Settings,
        capabilities: Capabilities,
    ) -> Result<Arc<Self>, InitializationError> {
        let pipeline = AssistantPipeline::new(&capabilities, &settings)?;

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            pipeline: Arc::new(pipeline),
            generator: capabilities.generator,
            started_at: Utc::now(),
        }))
    }
}
