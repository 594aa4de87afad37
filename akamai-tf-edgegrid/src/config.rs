//! EdgeGrid credentials
//!
//! Credentials come from a section of an `.edgerc` INI file. Any of the
//! `AKAMAI_HOST`, `AKAMAI_CLIENT_TOKEN`, `AKAMAI_CLIENT_SECRET` and
//! `AKAMAI_ACCESS_TOKEN` variables (or their `AKAMAI_<SECTION>_` forms for a
//! non-default section) override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::{DEFAULT_REQUEST_TIMEOUT, EdgeGridClient};
use crate::error::{EdgeGridError, EdgeGridResult};

/// Default maximum number of body bytes included in the content hash
pub const DEFAULT_MAX_BODY: usize = 131_072;

/// Default `.edgerc` section
pub const DEFAULT_SECTION: &str = "default";

/// Host and client credentials for one API client
#[derive(Clone, PartialEq, Eq)]
pub struct EdgeGridConfig {
    /// API host without scheme (e.g., "akab-xxx.luna.akamaiapis.net")
    pub host: String,
    pub client_token: String,
    pub client_secret: String,
    pub access_token: String,
    /// Maximum body size hashed when signing POST requests
    pub max_body: usize,
    /// Optional account switch key appended to every request
    pub account_switch_key: Option<String>,
}

impl std::fmt::Debug for EdgeGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeGridConfig")
            .field("host", &self.host)
            .field("client_token", &"<redacted>")
            .field("client_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("max_body", &self.max_body)
            .field("account_switch_key", &self.account_switch_key)
            .finish()
    }
}

impl EdgeGridConfig {
    /// Load credentials from `.edgerc` (if given) with environment overrides
    pub fn load(edgerc: Option<&Path>, section: &str) -> EdgeGridResult<Self> {
        let mut partial = match edgerc {
            Some(path) if path.exists() => PartialConfig::from_edgerc(path, section)?,
            Some(path) => {
                log::debug!(
                    "edgerc file {} not found, using environment only",
                    path.display()
                );
                PartialConfig::default()
            }
            None => PartialConfig::default(),
        };
        partial.apply_env(section, |key| std::env::var(key).ok());
        partial.finish(section)
    }

    /// Load credentials from a section of an `.edgerc` file only
    pub fn from_edgerc(path: &Path, section: &str) -> EdgeGridResult<Self> {
        PartialConfig::from_edgerc(path, section)?.finish(section)
    }

    /// Default `.edgerc` location (`$HOME/.edgerc`)
    pub fn default_edgerc_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".edgerc"))
    }

    pub fn with_account_switch_key(mut self, key: Option<String>) -> Self {
        self.account_switch_key = key.filter(|k| !k.is_empty());
        self
    }

    /// Base URL for API requests
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("https://") || host.starts_with("http://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }
}

/// Provider-level settings: where credentials come from and how to call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    /// Path of the `.edgerc` file; `$HOME/.edgerc` when unset
    #[serde(default)]
    pub edgerc: Option<PathBuf>,
    #[serde(default)]
    pub config_section: Option<String>,
    #[serde(default)]
    pub account_switch_key: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

impl ProviderConfig {
    pub fn section(&self) -> &str {
        self.config_section
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SECTION)
    }

    pub fn credentials(&self) -> EdgeGridResult<EdgeGridConfig> {
        let path = self
            .edgerc
            .clone()
            .or_else(EdgeGridConfig::default_edgerc_path);
        Ok(EdgeGridConfig::load(path.as_deref(), self.section())?
            .with_account_switch_key(self.account_switch_key.clone()))
    }

    pub fn client(&self) -> EdgeGridResult<EdgeGridClient> {
        let timeout = self
            .request_timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        EdgeGridClient::with_timeout(self.credentials()?, timeout)
    }
}

#[derive(Debug, Default)]
struct PartialConfig {
    host: Option<String>,
    client_token: Option<String>,
    client_secret: Option<String>,
    access_token: Option<String>,
    max_body: Option<usize>,
}

impl PartialConfig {
    fn from_edgerc(path: &Path, section: &str) -> EdgeGridResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Ini))
            .build()
            .map_err(|e| {
                EdgeGridError::configuration(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let get = |key: &str| -> Option<String> {
            settings
                .get_string(&format!("{}.{}", section, key))
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_body = match get("max_body") {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                EdgeGridError::configuration(format!(
                    "section [{}]: max_body '{}' is not a number",
                    section, raw
                ))
            })?),
            None => None,
        };

        Ok(Self {
            host: get("host"),
            client_token: get("client_token"),
            client_secret: get("client_secret"),
            access_token: get("access_token"),
            max_body,
        })
    }

    fn apply_env(&mut self, section: &str, lookup: impl Fn(&str) -> Option<String>) {
        let prefix = if section == DEFAULT_SECTION {
            "AKAMAI_".to_string()
        } else {
            format!("AKAMAI_{}_", section.to_uppercase())
        };
        let env = |name: &str| lookup(&format!("{}{}", prefix, name)).filter(|v| !v.is_empty());

        if let Some(v) = env("HOST") {
            self.host = Some(v);
        }
        if let Some(v) = env("CLIENT_TOKEN") {
            self.client_token = Some(v);
        }
        if let Some(v) = env("CLIENT_SECRET") {
            self.client_secret = Some(v);
        }
        if let Some(v) = env("ACCESS_TOKEN") {
            self.access_token = Some(v);
        }
        if let Some(v) = env("MAX_BODY").and_then(|v| v.parse().ok()) {
            self.max_body = Some(v);
        }
    }

    fn finish(self, section: &str) -> EdgeGridResult<EdgeGridConfig> {
        let missing = |name: &str| {
            EdgeGridError::configuration(format!(
                "section [{}] is missing required key '{}'",
                section, name
            ))
        };
        Ok(EdgeGridConfig {
            host: self.host.ok_or_else(|| missing("host"))?,
            client_token: self.client_token.ok_or_else(|| missing("client_token"))?,
            client_secret: self.client_secret.ok_or_else(|| missing("client_secret"))?,
            access_token: self.access_token.ok_or_else(|| missing("access_token"))?,
            max_body: self.max_body.unwrap_or(DEFAULT_MAX_BODY),
            account_switch_key: None,
        })
    }
}
