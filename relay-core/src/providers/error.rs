//! Provider error types and handling

use crate::providers::capabilities::Capability;
use std::sync::Arc;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur when interacting with LLM backends
///
/// The type is `Clone` so a failed stream can hand the same error to every
/// subsequent pull.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network or connection-level failure, passed through untouched
    #[error("Transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// The backend answered with a non-2xx status
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Backend-native JSON could not be decoded
    #[error("Failed to decode {backend} response: {message}")]
    Decode { backend: String, message: String },

    /// The backend does not offer the requested capability
    #[error("{backend} does not support {capability}")]
    Unsupported {
        backend: String,
        capability: Capability,
    },

    /// The caller's cancellation signal fired
    #[error("Request cancelled")]
    Cancelled,

    /// The request cannot be expressed for the target backend
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request signing failed
    #[error("Signing error: {0}")]
    Signing(String),
}

impl ProviderError {
    /// Build a decode error for a backend
    pub fn decode(backend: impl Into<String>, message: impl ToString) -> Self {
        ProviderError::Decode {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Build an unsupported-capability error for a backend
    pub fn unsupported(backend: impl Into<String>, capability: Capability) -> Self {
        ProviderError::Unsupported {
            backend: backend.into(),
            capability,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ProviderError::Unsupported { .. })
    }

    /// HTTP status for backend rejections
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Backend(err) => Some(err.status),
            ProviderError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(Arc::new(err))
    }
}

/// Typed rejection produced by an error classifier
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{backend} rejected the request ({status}, {kind}): {message}")]
pub struct BackendError {
    /// Backend name the request was sent to
    pub backend: String,
    /// HTTP status code
    pub status: u16,
    /// Classified failure kind
    pub kind: BackendErrorKind,
    /// Human-readable message extracted from the body when possible
    pub message: String,
    /// Raw response body
    pub body: String,
}

/// Classification of a backend rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Authentication,
    PermissionDenied,
    RateLimit,
    InvalidRequest,
    NotFound,
    Timeout,
    Server,
    Other,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendErrorKind::Authentication => "authentication",
            BackendErrorKind::PermissionDenied => "permission denied",
            BackendErrorKind::RateLimit => "rate limit",
            BackendErrorKind::InvalidRequest => "invalid request",
            BackendErrorKind::NotFound => "not found",
            BackendErrorKind::Timeout => "timeout",
            BackendErrorKind::Server => "server error",
            BackendErrorKind::Other => "error",
        };
        f.write_str(name)
    }
}
