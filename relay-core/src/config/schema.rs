//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Only schema version currently understood
pub const SUPPORTED_VERSION: &str = "0.1";

/// Root gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Backend used for bare model names
    #[serde(default)]
    pub default_backend: Option<String>,

    /// Configured backends
    #[serde(default)]
    pub backends: Vec<BackendConfig>,

    /// Shared connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// One configured backend
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Unique name, used as the `backend/` prefix of composite model ids
    pub name: String,

    #[serde(rename = "type")]
    pub backend_type: BackendType,

    /// API key for key-authenticated backends
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Override for the backend's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model used when a request names none
    #[serde(default)]
    pub default_model: Option<String>,

    // Bedrock only
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<SecretString>,

    #[serde(default)]
    pub session_token: Option<SecretString>,
}

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    OpenAI,
    Anthropic,
    Ollama,
    Bedrock,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::OpenAI => "openai",
            BackendType::Anthropic => "anthropic",
            BackendType::Ollama => "ollama",
            BackendType::Bedrock => "bedrock",
        }
    }

    /// Whether the backend authenticates with a static API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, BackendType::OpenAI | BackendType::Anthropic)
    }
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds; streaming bodies are not bounded by it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// Default value functions for serde
fn default_connect_timeout() -> u64 { 10000 }
fn default_request_timeout() -> u64 { 60000 }
fn default_max_idle() -> usize { 10 }

impl GatewayConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != SUPPORTED_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: SUPPORTED_VERSION.to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        if self.backends.is_empty() {
            return Err(ValidationError::required("backends")
                .with_context("At least one backend must be configured"));
        }

        let mut seen_names = HashSet::new();
        for (i, backend) in self.backends.iter().enumerate() {
            if !seen_names.insert(&backend.name) {
                return Err(ValidationError::new(
                    format!("backends[{}].name", i),
                    ValidationErrorKind::DuplicateValue {
                        value: backend.name.clone(),
                    },
                ));
            }

            backend.validate(&format!("backends[{}]", i))?;
        }

        if let Some(default) = &self.default_backend {
            if !self.backends.iter().any(|b| &b.name == default) {
                return Err(ValidationError::invalid_value(
                    "default_backend",
                    "configured backend name",
                    default.clone(),
                ));
            }
        }

        self.connection.validate("connection")
    }

    /// Look up a backend by name
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }
}

impl BackendConfig {
    /// A backend of `backend_type` with nothing else set
    pub fn new(name: impl Into<String>, backend_type: BackendType) -> Self {
        Self {
            name: name.into(),
            backend_type,
            api_key: None,
            base_url: None,
            default_model: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Validate backend configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::required(format!("{}.name", path)));
        }

        if self.name.contains('/') {
            return Err(ValidationError::invalid_format(
                format!("{}.name", path),
                "backend names cannot contain '/'",
            ));
        }

        if self.backend_type.requires_api_key()
            && self.api_key.as_ref().is_none_or(|key| key.is_empty())
        {
            return Err(ValidationError::required(format!("{}.api_key", path)));
        }

        if let Some(base_url) = &self.base_url {
            validate_url(&format!("{}.base_url", path), base_url)?;
        }

        if self.backend_type == BackendType::Bedrock {
            if self.region.as_deref().is_none_or(str::is_empty) {
                return Err(ValidationError::required(format!("{}.region", path))
                    .with_context("Bedrock backends sign requests for a region"));
            }
            if self.access_key_id.as_deref().is_none_or(str::is_empty) {
                return Err(ValidationError::required(format!("{}.access_key_id", path)));
            }
            if self
                .secret_access_key
                .as_ref()
                .is_none_or(|key| key.is_empty())
            {
                return Err(ValidationError::required(format!(
                    "{}.secret_access_key",
                    path
                )));
            }
        }

        Ok(())
    }
}

impl ConnectionConfig {
    /// Validate connection settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.connect_timeout_ms", path),
                "Must be greater than 0",
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.request_timeout_ms", path),
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn validate_url(path: &str, value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => Err(ValidationError::new(
            path,
            ValidationErrorKind::InvalidUrl {
                message: format!("URL scheme must be http or https, got: {}", url.scheme()),
            },
        )),
        Err(e) => Err(ValidationError::new(
            path,
            ValidationErrorKind::InvalidUrl {
                message: e.to_string(),
            },
        )),
    }
}
