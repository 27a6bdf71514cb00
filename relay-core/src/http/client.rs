//! HTTP sender implementation using reqwest

use super::error::{ErrorClassifier, StatusErrorClassifier};
use super::{OutgoingRequest, REQUEST_ID_HEADER};
use crate::config::ConnectionConfig;
use crate::providers::{ProviderError, ProviderResult};
use bytes::Bytes;
use reqwest::header::HeaderValue;
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Maximum buffered (non-streaming) response size
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP sender with connection pooling
#[derive(Clone)]
pub struct HttpSender {
    /// The underlying reqwest client
    client: Client,

    /// Converts non-2xx responses to typed errors
    classifier: Arc<dyn ErrorClassifier>,

    /// Applied to buffered requests without an explicit timeout
    request_timeout: Duration,

    max_response_size: usize,
}

impl HttpSender {
    /// Create a sender with default connection settings
    pub fn new() -> ProviderResult<Self> {
        Self::with_config(&ConnectionConfig::default())
    }

    /// Create a sender from connection settings
    ///
    /// The request timeout is applied per request rather than on the client
    /// so streaming bodies can outlive it.
    pub fn with_config(config: &ConnectionConfig) -> ProviderResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(config.connect_timeout())
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            classifier: Arc::new(StatusErrorClassifier),
            request_timeout: config.request_timeout(),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Replace the error classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Send a request and return the response once a 2xx status arrived.
    ///
    /// A cancelled token and invalid header values are checked before any
    /// I/O, and the token is raced against the exchange. Non-2xx responses are
    /// read fully and classified.
    pub async fn send(
        &self,
        request: OutgoingRequest<'_>,
        cancel: &CancellationToken,
    ) -> ProviderResult<Response> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let backend = request.backend;
        let request_id = request.options.request_id;

        if let Some(name) = request.invalid_header {
            warn!(backend, request_id = %request_id, header = name, "invalid header value");
            return Err(ProviderError::InvalidRequest(format!(
                "invalid value for header '{}'",
                name
            )));
        }

        let mut http_request = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body.clone())
            .build()?;

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            http_request.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        if !request.streaming {
            *http_request.timeout_mut() = Some(request.options.timeout.unwrap_or(self.request_timeout));
        } else if let Some(timeout) = request.options.timeout {
            *http_request.timeout_mut() = Some(timeout);
        }

        // Signing must see the final header set
        if let Some(signer) = request.signer {
            signer.sign(&mut http_request, &request.body)?;
        }

        info!(
            backend,
            request_id = %request_id,
            url = %http_request.url(),
            streaming = request.streaming,
            "sending request"
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(backend, request_id = %request_id, "request cancelled");
                return Err(ProviderError::Cancelled);
            }
            result = self.client.execute(http_request) => result.map_err(|e| {
                if e.is_timeout() {
                    warn!(backend, request_id = %request_id, "request timed out");
                } else {
                    error!(backend, request_id = %request_id, error = %e, "transport error");
                }
                ProviderError::from(e)
            })?,
        };

        let status = response.status();
        debug!(backend, request_id = %request_id, status = status.as_u16(), "response status");

        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                body = response.bytes() => match body {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(backend, request_id = %request_id, error = %e, "failed to read rejection body");
                        Bytes::new()
                    }
                },
            };
            warn!(
                backend,
                request_id = %request_id,
                status = status.as_u16(),
                "backend rejected request"
            );
            return Err(self.classifier.classify(backend, status, &body));
        }

        Ok(response)
    }

    /// Send a request and read the whole body
    pub async fn send_bytes(
        &self,
        request: OutgoingRequest<'_>,
        cancel: &CancellationToken,
    ) -> ProviderResult<Bytes> {
        let backend = request.backend;
        let request_id = request.options.request_id;
        let response = self.send(request, cancel).await?;

        if let Some(length) = response.content_length() {
            if length as usize > self.max_response_size {
                return Err(ProviderError::decode(
                    backend,
                    format!("response size {} exceeds maximum {}", length, self.max_response_size),
                ));
            }
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            body = response.bytes() => body?,
        };

        if body.len() > self.max_response_size {
            return Err(ProviderError::decode(
                backend,
                format!("response size {} exceeds maximum {}", body.len(), self.max_response_size),
            ));
        }

        info!(backend, request_id = %request_id, bytes = body.len(), "request completed");
        Ok(body)
    }

    /// Send a request and decode the JSON body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: OutgoingRequest<'_>,
        cancel: &CancellationToken,
    ) -> ProviderResult<T> {
        let backend = request.backend;
        let request_id = request.options.request_id;
        let body = self.send_bytes(request, cancel).await?;

        serde_json::from_slice(&body).map_err(|e| {
            error!(backend, request_id = %request_id, error = %e, "failed to decode response");
            ProviderError::decode(backend, e)
        })
    }
}

impl std::fmt::Debug for HttpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSender")
            .field("request_timeout", &self.request_timeout)
            .field("max_response_size", &self.max_response_size)
            .finish()
    }
}
