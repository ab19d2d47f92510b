use crate::ConfigResult;

/// Trait implemented by every configuration section
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// Common validation helpers shared by the configuration models
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that a timeout is reasonable
    pub fn validate_timeout_seconds(timeout_seconds: u64, field_name: &str) -> ConfigResult<()> {
        if timeout_seconds == 0 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if timeout_seconds > 3600 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be less than or equal to 3600"
            )));
        }
        Ok(())
    }

    /// Validate that a URL parses and uses one of the allowed schemes
    pub fn validate_url(url: &str, schemes: &[&str], field_name: &str) -> ConfigResult<()> {
        Self::validate_not_empty(url, field_name)?;

        let parsed = url::Url::parse(url)?;
        if !schemes.contains(&parsed.scheme()) {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must use one of the schemes: {}",
                schemes.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate a `host:port` socket address
    pub fn validate_bind_address(address: &str, field_name: &str) -> ConfigResult<()> {
        address
            .parse::<std::net::SocketAddr>()
            .map(|_| ())
            .map_err(|e| {
                crate::ConfigError::Validation(format!("{field_name} is not a valid address: {e}"))
            })
    }
}
