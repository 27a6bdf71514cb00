//! AWS Signature Version 4 request signing
//!
//! Implements the published SigV4 algorithm on top of `reqwest::Request`:
//! canonical request, string-to-sign, derived signing key and the final
//! `Authorization` header. Given the same inputs and timestamp the output is
//! byte-identical, which is what the unit tests rely on.

use super::AwsCredentials;
use crate::providers::{ProviderError, ProviderResult};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderName, HeaderValue};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm tag used in the string-to-sign and the `Authorization` header
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Timestamp header
pub const X_AMZ_DATE: &str = "x-amz-date";

/// Session token header for temporary credentials
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

const TERMINATOR: &str = "aws4_request";

/// Signs requests for one region/service pair
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: AwsCredentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(
        credentials: AwsCredentials,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Sign with the current time
    pub fn sign(&self, request: &mut reqwest::Request, body: &[u8]) -> ProviderResult<()> {
        self.sign_at(request, body, Utc::now())
    }

    /// Sign with an explicit timestamp
    pub fn sign_at(
        &self,
        request: &mut reqwest::Request,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> ProviderResult<()> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let host = host_header(request.url())?;
        set_header(request, X_AMZ_DATE, &amz_date)?;
        set_header(request, "host", &host)?;

        // Must be present before the canonical headers are collected.
        if let Some(token) = &self.credentials.session_token {
            set_header(request, X_AMZ_SECURITY_TOKEN, token.expose_secret())?;
        }

        let (canonical_headers, signed_headers) = canonical_headers(request)?;
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method().as_str().to_uppercase(),
            canonical_uri(request.url().path()),
            canonical_query(request.url().query().unwrap_or("")),
            canonical_headers,
            signed_headers,
            hex_sha256(body),
        );

        let scope = credential_scope(&date, &self.region, &self.service);
        let string_to_sign = string_to_sign(&amz_date, &scope, &canonical_request);
        let key = derive_signing_key(
            self.credentials.secret_access_key.expose_secret(),
            &date,
            &self.region,
            &self.service,
        )?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        debug!(scope = %scope, signed_headers = %signed_headers, "signed request");

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
        );
        set_header(request, "authorization", &authorization)
    }
}

/// Lowercase hex SHA-256 digest
pub fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// `date/region/service/aws4_request`
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/{}", date, region, service, TERMINATOR)
}

/// Algorithm tag, timestamp, scope and the hashed canonical request, one per line
pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex_sha256(canonical_request.as_bytes())
    )
}

/// Four chained HMACs seeded with `AWS4` + secret
pub fn derive_signing_key(
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> ProviderResult<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> ProviderResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ProviderError::Signing(format!("invalid HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// RFC 3986 encoding: only `A-Z a-z 0-9 - _ . ~` pass through
pub fn uri_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Canonical URI: every path segment encoded once more (non-S3 rule), `/` when empty
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Canonical query: decoded pairs re-encoded and sorted by key, then value
pub fn canonical_query(query: &str) -> String {
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (uri_encode(&percent_decode(key)), uri_encode(&percent_decode(value)))
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Canonical header block and the `;`-joined signed header list
fn canonical_headers(request: &reqwest::Request) -> ProviderResult<(String, String)> {
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in request.headers() {
        let value = value.to_str().map_err(|_| {
            ProviderError::Signing(format!("header '{}' is not valid ASCII", name))
        })?;
        headers
            .entry(name.as_str().to_lowercase())
            .or_default()
            .push(trim_all(value));
    }

    let block = headers
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect::<String>();
    let signed = headers.keys().cloned().collect::<Vec<_>>().join(";");
    Ok((block, signed))
}

/// Trim and collapse runs of spaces
fn trim_all(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn host_header(url: &reqwest::Url) -> ProviderResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| ProviderError::Signing(format!("request URL has no host: {}", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn set_header(request: &mut reqwest::Request, name: &'static str, value: &str) -> ProviderResult<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| ProviderError::Signing(format!("invalid value for '{}': {}", name, e)))?;
    request
        .headers_mut()
        .insert(HeaderName::from_static(name), value);
    Ok(())
}
