//! HTTP layer shared by every backend sender
//!
//! This module handles:
//! - Connection pooling and client management
//! - Request ID generation and correlation
//! - Optional SigV4 signing of the finalized request
//! - Cancellation and classification of rejected responses

pub mod client;
pub mod error;

pub use client::HttpSender;
pub use error::{ErrorClassifier, StatusErrorClassifier};

use crate::signing::SigV4Signer;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::time::Duration;
use uuid::Uuid;

/// Correlation header attached to every request
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Options for an HTTP request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Whole-request timeout; `None` leaves the body unbounded
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }
}

impl RequestOptions {
    /// Set the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully transformed backend request, ready to send
#[derive(Debug)]
pub struct OutgoingRequest<'a> {
    /// Backend name, used for logs and error classification
    pub backend: &'a str,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Signs the request after every header is in place
    pub signer: Option<&'a SigV4Signer>,
    /// Expect a long-lived body that is read incrementally
    pub streaming: bool,
    pub options: RequestOptions,
    /// First header whose value could not be encoded; fails the send
    pub(crate) invalid_header: Option<&'static str>,
}

impl<'a> OutgoingRequest<'a> {
    /// A JSON POST request
    pub fn post_json(backend: &'a str, url: impl Into<String>, body: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Self {
            backend,
            method: Method::POST,
            url: url.into(),
            headers,
            body: Bytes::from(body),
            signer: None,
            streaming: false,
            options: RequestOptions::default(),
            invalid_header: None,
        }
    }

    /// Add a header. A value that is not a valid header value makes `send`
    /// fail with `InvalidRequest` before any I/O.
    pub fn header(mut self, name: &'static str, value: impl AsRef<str>) -> Self {
        let header = HeaderName::from_static(name);
        match HeaderValue::from_str(value.as_ref()) {
            Ok(mut value) => {
                if is_sensitive(&header) {
                    value.set_sensitive(true);
                }
                self.headers.insert(header, value);
            }
            Err(_) => {
                self.invalid_header.get_or_insert(name);
            }
        }
        self
    }

    pub fn signed_by(mut self, signer: &'a SigV4Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

fn is_sensitive(name: &HeaderName) -> bool {
    name == reqwest::header::AUTHORIZATION || name.as_str() == "x-api-key"
}
