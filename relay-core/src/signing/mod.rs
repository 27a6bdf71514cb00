//! Request signing
//!
//! Only the Bedrock backend signs its requests; everything else authenticates
//! with static headers.

pub mod sigv4;

pub use sigv4::SigV4Signer;

use crate::config::SecretString;
use crate::providers::{ProviderError, ProviderResult};
use std::env;

/// AWS access credentials, optionally temporary
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    /// Present for temporary (STS) credentials
    pub session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: None,
        }
    }

    /// Attach a session token
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(SecretString::new(token.into()));
        self
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and optional `AWS_SESSION_TOKEN`
    pub fn from_env() -> ProviderResult<Self> {
        let access_key_id = env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            ProviderError::Configuration("AWS_ACCESS_KEY_ID is not set".to_string())
        })?;
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            ProviderError::Configuration("AWS_SECRET_ACCESS_KEY is not set".to_string())
        })?;

        let mut credentials = Self::new(access_key_id, secret_access_key);
        if let Ok(token) = env::var("AWS_SESSION_TOKEN") {
            if !token.is_empty() {
                credentials = credentials.with_session_token(token);
            }
        }
        Ok(credentials)
    }
}
