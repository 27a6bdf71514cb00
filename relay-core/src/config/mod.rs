//! Gateway configuration
//!
//! Backends, credentials and connection settings are loaded from YAML or
//! JSON. `${VAR}` references are resolved from the environment before the
//! document is parsed, and the result is validated with field-path errors.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{BackendConfig, BackendType, ConnectionConfig, GatewayConfig, SUPPORTED_VERSION};
pub use secrets::{SafeLogging, SecretString};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<GatewayConfig> {
    let path = path.as_ref();
    let content = read(path)?;
    parse_yaml(&content, &path.to_string_lossy())
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<GatewayConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: GatewayConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

/// Parse a YAML document already in memory; `origin` names it in errors
pub fn parse_yaml(content: &str, origin: &str) -> ConfigResult<GatewayConfig> {
    let interpolated = env::interpolate_env_vars(content)?;

    let config: GatewayConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn finish(mut config: GatewayConfig) -> ConfigResult<GatewayConfig> {
    // Additional interpolation for any remaining env vars
    env::interpolate_config_env_vars(&mut config)?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_yaml() {
        let yaml = r#"
version: "0.1"
default_backend: local
backends:
  - name: local
    type: ollama
    base_url: http://localhost:11434
  - name: claude
    type: anthropic
    api_key: test-key-123456
connection:
  request_timeout_ms: 30000
"#;
        let config = parse_yaml(yaml, "inline").unwrap();
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.default_backend.as_deref(), Some("local"));
        assert_eq!(config.connection.request_timeout_ms, 30000);
        assert_eq!(config.connection.connect_timeout_ms, 10000);
        assert_eq!(config.backend("claude").map(|b| b.backend_type), Some(BackendType::Anthropic));
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let yaml = r#"
version: "0.1"
backends:
  - name: local
    type: ollama
    colour: blue
"#;
        assert!(matches!(parse_yaml(yaml, "inline"), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_unknown_backend_type() {
        let yaml = r#"
version: "0.1"
backends:
  - name: g
    type: gemini
"#;
        assert!(parse_yaml(yaml, "inline").is_err());
    }
}
