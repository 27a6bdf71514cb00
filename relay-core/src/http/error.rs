//! Classification of non-2xx backend responses

use crate::providers::{BackendError, BackendErrorKind, ProviderError};
use reqwest::StatusCode;
use serde_json::Value;

/// Turns a rejected response into a typed error
///
/// Senders call this for every non-2xx status; they never inspect error
/// envelopes themselves.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, backend: &str, status: StatusCode, body: &[u8]) -> ProviderError;
}

/// Default classifier: status code decides the kind, the body supplies the message
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusErrorClassifier;

impl ErrorClassifier for StatusErrorClassifier {
    fn classify(&self, backend: &str, status: StatusCode, body: &[u8]) -> ProviderError {
        let body = String::from_utf8_lossy(body).into_owned();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| extract_error_message(&v))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP error {}", status.as_u16())
                } else {
                    body.trim().to_string()
                }
            });

        ProviderError::Backend(BackendError {
            backend: backend.to_string(),
            status: status.as_u16(),
            kind: kind_for_status(status),
            message,
            body,
        })
    }
}

/// Map an HTTP status to a rejection kind
pub fn kind_for_status(status: StatusCode) -> BackendErrorKind {
    match status {
        StatusCode::UNAUTHORIZED => BackendErrorKind::Authentication,
        StatusCode::FORBIDDEN => BackendErrorKind::PermissionDenied,
        StatusCode::TOO_MANY_REQUESTS => BackendErrorKind::RateLimit,
        StatusCode::NOT_FOUND => BackendErrorKind::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendErrorKind::Timeout,
        status if status.is_server_error() => BackendErrorKind::Server,
        status if status.is_client_error() => BackendErrorKind::InvalidRequest,
        _ => BackendErrorKind::Other,
    }
}

/// Extract a message from the common error envelopes
fn extract_error_message(json: &Value) -> Option<String> {
    // OpenAI and Anthropic: { "error": { "message": "...", "type": "..." } }
    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return Some(message.to_string());
    }

    // Bedrock: { "message": "..." } or { "Message": "..." }
    for key in ["message", "Message"] {
        if let Some(message) = json.get(key).and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }

    // Ollama: { "error": "..." }
    json.get("error").and_then(Value::as_str).map(str::to_string)
}
