//! Signed JSON client for Akamai APIs

use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::EdgeGridConfig;
use crate::error::{EdgeGridError, EdgeGridResult};
use crate::signer::{SignableRequest, Signer};

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Problem details returned by Akamai APIs on failure
#[derive(Debug, Default, serde::Deserialize)]
struct Problem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// HTTP client that signs every request with EdgeGrid credentials
#[derive(Debug, Clone)]
pub struct EdgeGridClient {
    http: Client,
    signer: Signer,
    base_url: Url,
    account_switch_key: Option<String>,
}

impl EdgeGridClient {
    pub fn new(config: EdgeGridConfig) -> EdgeGridResult<Self> {
        Self::with_timeout(config, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: EdgeGridConfig, timeout: Duration) -> EdgeGridResult<Self> {
        let base_url = Url::parse(&config.base_url()).map_err(|e| {
            EdgeGridError::configuration(format!("invalid host '{}': {}", config.host, e))
        })?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            account_switch_key: config.account_switch_key.clone(),
            signer: Signer::new(config),
            base_url,
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> EdgeGridResult<T> {
        self.send::<(), T>(Method::GET, path, query, None).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> EdgeGridResult<T> {
        self.send(Method::POST, path, query, Some(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> EdgeGridResult<T> {
        self.send(Method::PUT, path, query, Some(body)).await
    }

    pub async fn delete<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> EdgeGridResult<T> {
        self.send(Method::DELETE, path, query, body).await
    }

    /// Build the full request URL, including the account switch key
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> EdgeGridResult<Url> {
        let mut url = self.base_url.join(path).map_err(|e| {
            EdgeGridError::configuration(format!("invalid request path '{}': {}", path, e))
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Some(key) = &self.account_switch_key {
                pairs.append_pair("accountSwitchKey", key);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> EdgeGridResult<T> {
        let url = self.url(path, query)?;
        let payload = match body {
            Some(b) => serde_json::to_vec(b)?,
            None => Vec::new(),
        };

        let path_and_query = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        let authorization = self.signer.authorization(&SignableRequest {
            method: method.as_str(),
            scheme: url.scheme(),
            host: url.host_str().unwrap_or_default(),
            path_and_query: &path_and_query,
            body: &payload,
        })?;

        log::debug!("{} {}", method, path_and_query);

        let mut request = self
            .http
            .request(method.clone(), url)
            .header("Authorization", authorization)
            .header("Accept", "application/json");
        if body.is_some() {
            request = request
                .header("Content-Type", "application/json")
                .body(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).to_string();
            log::debug!("{} {} -> {}", method, path_and_query, status);
            return Err(api_error(status.as_u16(), body));
        }

        decode(&bytes)
    }
}

fn api_error(status: u16, body: String) -> EdgeGridError {
    let problem: Problem = serde_json::from_str(&body).unwrap_or_default();
    EdgeGridError::Api {
        status,
        title: problem
            .title
            .unwrap_or_else(|| format!("HTTP status {}", status)),
        detail: problem.detail,
        body,
    }
}

/// Decode a success body; an empty body decodes as JSON `null`
fn decode<T: DeserializeOwned>(bytes: &[u8]) -> EdgeGridResult<T> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(account_switch_key: Option<&str>) -> EdgeGridClient {
        let config = EdgeGridConfig {
            host: "akab-host.luna.akamaiapis.net".to_string(),
            client_token: "ct".to_string(),
            client_secret: "cs".to_string(),
            access_token: "at".to_string(),
            max_body: 1024,
            account_switch_key: None,
        }
        .with_account_switch_key(account_switch_key.map(str::to_string));
        EdgeGridClient::new(config).unwrap()
    }

    #[test]
    fn test_url_with_query_and_switch_key() {
        let url = client(Some("1-ABC"))
            .url(
                "/papi/v1/properties/prp_1/activations",
                &[("contractId", "ctr_1".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://akab-host.luna.akamaiapis.net/papi/v1/properties/prp_1/activations?contractId=ctr_1&accountSwitchKey=1-ABC"
        );
    }

    #[test]
    fn test_url_without_query_has_no_question_mark() {
        let url = client(None).url("/domain-validation/v1/domains", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://akab-host.luna.akamaiapis.net/domain-validation/v1/domains"
        );
    }

    #[test]
    fn test_api_error_uses_problem_details() {
        let err = api_error(
            400,
            r#"{"type":"x","title":"Bad Request","detail":"version must be positive"}"#.to_string(),
        );
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.to_string(),
            "API error 400: Bad Request (version must be positive)"
        );

        let err = api_error(502, "<html>gateway</html>".to_string());
        assert_eq!(err.to_string(), "API error 502: HTTP status 502");
    }

    #[test]
    fn test_decode_empty_body() {
        let unit: () = decode(b"").unwrap();
        assert_eq!(unit, ());
        let value: serde_json::Value = decode(b"  ").unwrap();
        assert!(value.is_null());
        let list: Vec<u32> = decode(b"[1,2]").unwrap();
        assert_eq!(list, vec![1, 2]);
    }
}
