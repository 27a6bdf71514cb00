//! Configuration validation utilities

use super::error::{ValidationError, ValidationErrorKind};
use super::schema::GatewayConfig;
use regex::Regex;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern compiles")
});

static SENSITIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(api_key|secret|token|password|credential)").expect("static pattern compiles")
});

/// Configuration validator with rules spanning several fields
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        // First run the built-in validation
        config.validate()?;

        self.validate_unresolved_placeholders(config)?;
        self.validate_default_backend(config)?;

        Ok(())
    }

    /// Placeholders that survived interpolation mean a variable was never resolved
    fn validate_unresolved_placeholders(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        for (i, backend) in config.backends.iter().enumerate() {
            let secrets = [
                ("api_key", backend.api_key.as_ref()),
                ("secret_access_key", backend.secret_access_key.as_ref()),
                ("session_token", backend.session_token.as_ref()),
            ];
            for (field, secret) in secrets {
                if let Some(var) = secret.and_then(|s| self.extract_env_vars(s.expose_secret()).pop()) {
                    return Err(ValidationError::new(
                        format!("backends[{}].{}", i, field),
                        ValidationErrorKind::InvalidFormat {
                            message: format!("unresolved environment variable '{}'", var),
                        },
                    ));
                }
            }
        }
        Ok(())
    }

    /// Without an explicit default, bare model names need exactly one backend
    fn validate_default_backend(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        if config.default_backend.is_none() && config.backends.len() > 1 {
            tracing::debug!(
                backends = config.backends.len(),
                "no default_backend configured; bare model names will be rejected"
            );
        }
        Ok(())
    }

    /// Check if a field name appears to contain sensitive information
    pub fn is_sensitive_field(&self, field_name: &str) -> bool {
        SENSITIVE_PATTERN.is_match(field_name)
    }

    /// Extract environment variables from a string
    pub fn extract_env_vars(&self, text: &str) -> Vec<String> {
        ENV_VAR_PATTERN
            .captures_iter(text)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}
