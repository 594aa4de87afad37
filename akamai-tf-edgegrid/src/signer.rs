//! EdgeGrid request signing (EG1-HMAC-SHA256)
//!
//! The signature covers the method, scheme, host, path with query, the
//! content hash of POST bodies and the authorization prefix itself. The
//! signing key is derived per request from the client secret and the
//! request timestamp.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::EdgeGridConfig;
use crate::error::{EdgeGridError, EdgeGridResult};

type HmacSha256 = Hmac<Sha256>;

/// Computes `Authorization` headers for one set of credentials
#[derive(Debug, Clone)]
pub struct Signer {
    config: EdgeGridConfig,
}

/// The parts of a request that are covered by the signature
#[derive(Debug, Clone, Copy)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub scheme: &'a str,
    pub host: &'a str,
    /// Path including the query string (e.g., "/papi/v1/groups?contractId=ctr_1")
    pub path_and_query: &'a str,
    pub body: &'a [u8],
}

impl Signer {
    pub fn new(config: EdgeGridConfig) -> Self {
        Self { config }
    }

    /// Sign a request with a fresh timestamp and nonce
    pub fn authorization(&self, request: &SignableRequest<'_>) -> EdgeGridResult<String> {
        let nonce = uuid::Uuid::new_v4().to_string();
        self.authorization_at(request, Utc::now(), &nonce)
    }

    /// Sign a request with an explicit timestamp and nonce
    pub fn authorization_at(
        &self,
        request: &SignableRequest<'_>,
        now: DateTime<Utc>,
        nonce: &str,
    ) -> EdgeGridResult<String> {
        let timestamp = format_timestamp(now);
        let auth_prefix = format!(
            "EG1-HMAC-SHA256 client_token={};access_token={};timestamp={};nonce={};",
            self.config.client_token, self.config.access_token, timestamp, nonce
        );

        let data_to_sign = [
            request.method.to_uppercase(),
            request.scheme.to_lowercase(),
            request.host.to_lowercase(),
            request.path_and_query.to_string(),
            // no headers are included in the signature
            String::new(),
            self.content_hash(request),
            auth_prefix.clone(),
        ]
        .join("\t");

        let secret = self.config.client_secret.as_bytes();
        let signing_key = hmac_base64(secret, timestamp.as_bytes())?;
        let signature = hmac_base64(signing_key.as_bytes(), data_to_sign.as_bytes())?;

        Ok(format!("{}signature={}", auth_prefix, signature))
    }

    fn content_hash(&self, request: &SignableRequest<'_>) -> String {
        if !request.method.eq_ignore_ascii_case("POST") || request.body.is_empty() {
            return String::new();
        }
        let limit = request.body.len().min(self.config.max_body);
        STANDARD.encode(Sha256::digest(&request.body[..limit]))
    }
}

/// EdgeGrid timestamp format (e.g., "20240102T03:04:05+0000")
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H:%M:%S+0000").to_string()
}

fn hmac_base64(key: &[u8], data: &[u8]) -> EdgeGridResult<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| EdgeGridError::configuration(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
