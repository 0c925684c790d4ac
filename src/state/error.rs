use thiserror::Error;

use crate::capability::CapabilityError;
use crate::core::config::ConfigError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize capability: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Failed to compile {what} patterns: {source}")]
    Patterns {
        what: &'static str,
        #[source]
        source: regex::Error,
    },
}

impl InitializationError {
    pub fn patterns(what: &'static str) -> impl FnOnce(regex::Error) -> Self {
        move |source| Self::Patterns { what, source }
    }
}
