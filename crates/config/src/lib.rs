pub mod models;
pub mod validation;

pub use models::{
    ApiConfig, AppConfig, DispatchMode, DistanceConfig, LocationStoreConfig, LocationStoreType,
    LogFormat, MessageQueueConfig, MessageQueueType, ObservabilityConfig, WorkerConfig,
};
pub use validation::{ConfigValidator, ValidationUtils};

/// Configuration error type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error enumeration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
