//! Integration tests for configuration loading and validation

use relay_core::config::{
    load_from_json, load_from_yaml, parse_yaml, BackendType, ConfigError, SafeLogging,
    ValidationErrorKind,
};
use relay_core::providers::ProviderError;
use relay_core::Gateway;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a test config file
fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_valid_yaml_config() {
    std::env::set_var("RELAY_TEST_OPENAI_KEY", "sk-from-env");

    let yaml = r#"
version: "0.1"
default_backend: openai
backends:
  - name: openai
    type: openai
    api_key: ${RELAY_TEST_OPENAI_KEY}
    default_model: gpt-4o-mini
  - name: local
    type: ollama
    base_url: http://localhost:11434
connection:
  request_timeout_ms: 30000
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "relay.yaml", yaml);
    let config = load_from_yaml(path).unwrap();

    assert_eq!(config.version, "0.1");
    assert_eq!(config.backends.len(), 2);
    assert_eq!(config.default_backend.as_deref(), Some("openai"));

    let openai = config.backend("openai").unwrap();
    assert_eq!(openai.backend_type, BackendType::OpenAI);
    assert_eq!(openai.api_key.as_ref().unwrap().expose_secret(), "sk-from-env");
    assert_eq!(config.backend("local").unwrap().backend_type, BackendType::Ollama);

    assert_eq!(config.connection.request_timeout_ms, 30000);
    assert_eq!(config.connection.connect_timeout_ms, 10000);

    std::env::remove_var("RELAY_TEST_OPENAI_KEY");
}

#[test]
fn test_load_valid_json_config() {
    let json = r#"{
  "version": "0.1",
  "backends": [
    {
      "name": "bedrock",
      "type": "bedrock",
      "region": "us-west-2",
      "access_key_id": "AKIDEXAMPLE",
      "secret_access_key": "wJalrXUtnFEMI"
    }
  ]
}"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "relay.json", json);
    let config = load_from_json(path).unwrap();

    let bedrock = config.backend("bedrock").unwrap();
    assert_eq!(bedrock.backend_type, BackendType::Bedrock);
    assert_eq!(bedrock.region.as_deref(), Some("us-west-2"));
    assert!(bedrock.session_token.is_none());
}

#[test]
fn test_missing_file() {
    match load_from_yaml("/nonexistent/relay.yaml") {
        Err(ConfigError::IoError { path, .. }) => assert!(path.contains("relay.yaml")),
        other => panic!("expected IoError, got {:?}", other),
    }
}

#[test]
fn test_missing_env_var() {
    let yaml = r#"
version: "0.1"
backends:
  - name: openai
    type: openai
    api_key: ${RELAY_TEST_DEFINITELY_UNSET}
"#;
    match parse_yaml(yaml, "inline") {
        Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, "RELAY_TEST_DEFINITELY_UNSET"),
        other => panic!("expected EnvVarNotFound, got {:?}", other),
    }
}

#[test]
fn test_parse_error_has_location() {
    let yaml = "version: \"0.1\"\nbackends:\n  - name: [unclosed\n";
    match parse_yaml(yaml, "broken.yaml") {
        Err(ConfigError::ParseError { path, line, .. }) => {
            assert_eq!(path, "broken.yaml");
            assert!(line.is_some());
        }
        other => panic!("expected ParseError, got {:?}", other),
    }
}

#[test]
fn test_unknown_fields_rejected() {
    let yaml = r#"
version: "0.1"
backends:
  - name: openai
    type: openai
    api_key: sk
    organisation: acme
"#;
    assert!(matches!(parse_yaml(yaml, "inline"), Err(ConfigError::ParseError { .. })));
}

fn validation_path(yaml: &str) -> String {
    match parse_yaml(yaml, "inline") {
        Err(ConfigError::ValidationError(err)) => err.field_path,
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_api_key_required() {
    let yaml = r#"
version: "0.1"
backends:
  - name: claude
    type: anthropic
"#;
    assert_eq!(validation_path(yaml), "backends[0].api_key");
}

#[test]
fn test_bedrock_region_required() {
    let yaml = r#"
version: "0.1"
backends:
  - name: local
    type: ollama
  - name: aws
    type: bedrock
    access_key_id: AKID
    secret_access_key: secret
"#;
    assert_eq!(validation_path(yaml), "backends[1].region");
}

#[test]
fn test_duplicate_backend_names() {
    let yaml = r#"
version: "0.1"
backends:
  - name: local
    type: ollama
  - name: local
    type: ollama
"#;
    match parse_yaml(yaml, "inline") {
        Err(ConfigError::ValidationError(err)) => {
            assert_eq!(err.field_path, "backends[1].name");
            assert!(matches!(err.kind, ValidationErrorKind::DuplicateValue { .. }));
        }
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_backend_name_cannot_contain_slash() {
    let yaml = r#"
version: "0.1"
backends:
  - name: team/local
    type: ollama
"#;
    assert_eq!(validation_path(yaml), "backends[0].name");
}

#[test]
fn test_default_backend_must_exist() {
    let yaml = r#"
version: "0.1"
default_backend: missing
backends:
  - name: local
    type: ollama
"#;
    assert_eq!(validation_path(yaml), "default_backend");
}

#[test]
fn test_unsupported_version() {
    let yaml = r#"
version: "9.9"
backends:
  - name: local
    type: ollama
"#;
    match parse_yaml(yaml, "inline") {
        Err(ConfigError::ValidationError(err)) => {
            assert!(matches!(err.kind, ValidationErrorKind::InvalidVersion { .. }));
        }
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_invalid_base_url() {
    let yaml = r#"
version: "0.1"
backends:
  - name: local
    type: ollama
    base_url: ftp://example.com
"#;
    assert_eq!(validation_path(yaml), "backends[0].base_url");
}

#[test]
fn test_secrets_redacted_in_logs() {
    let yaml = r#"
version: "0.1"
backends:
  - name: openai
    type: openai
    api_key: sk-1234567890abcdef
"#;
    let config = parse_yaml(yaml, "inline").unwrap();
    let backend = &config.backends[0];

    let logged = backend.safe_for_logging();
    assert!(!logged.contains("sk-1234567890abcdef"));
    assert!(!format!("{:?}", backend).contains("sk-1234567890abcdef"));
}

#[test]
fn test_gateway_from_config() {
    let yaml = r#"
version: "0.1"
default_backend: local
backends:
  - name: local
    type: ollama
    default_model: llama3
  - name: claude
    type: anthropic
    api_key: ak-test
"#;
    let config = parse_yaml(yaml, "inline").unwrap();
    let gateway = Gateway::from_config(&config).unwrap();

    assert_eq!(gateway.backend_names(), vec!["claude", "local"]);
    assert!(gateway.backend("claude").unwrap().capabilities().vision);
}

#[test]
fn test_config_error_becomes_configuration_error() {
    let err: ProviderError = ConfigError::EnvVarNotFound {
        var: "X".to_string(),
    }
    .into();
    assert!(matches!(err, ProviderError::Configuration(_)));
}
