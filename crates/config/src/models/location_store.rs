use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationStoreType {
    Redis,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationStoreConfig {
    pub r#type: LocationStoreType,
    pub url: String,
    pub connection_timeout_seconds: u64,
}

impl Default for LocationStoreConfig {
    fn default() -> Self {
        Self {
            r#type: LocationStoreType::Redis,
            url: "redis://127.0.0.1:6379/0".to_string(),
            connection_timeout_seconds: 5,
        }
    }
}

impl LocationStoreConfig {
    pub fn in_memory_default() -> Self {
        Self {
            r#type: LocationStoreType::InMemory,
            url: "".to_string(),
            connection_timeout_seconds: 1,
        }
    }
}

impl ConfigValidator for LocationStoreConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.r#type == LocationStoreType::Redis {
            ValidationUtils::validate_url(&self.url, &["redis", "rediss"], "location_store.url")?;
        }
        ValidationUtils::validate_timeout_seconds(
            self.connection_timeout_seconds,
            "location_store.connection_timeout_seconds",
        )?;
        Ok(())
    }
}
