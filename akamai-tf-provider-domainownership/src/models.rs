//! Domain validation wire models

use std::fmt;
use std::str::FromStr;

use akamai_tf_core::resource::null_as_default;
use serde::{Deserialize, Serialize};

/// What part of the name space a validation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationScope {
    Host,
    Wildcard,
    Domain,
}

impl ValidationScope {
    pub const ALL: [ValidationScope; 3] = [
        ValidationScope::Host,
        ValidationScope::Wildcard,
        ValidationScope::Domain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationScope::Host => "HOST",
            ValidationScope::Wildcard => "WILDCARD",
            ValidationScope::Domain => "DOMAIN",
        }
    }
}

impl fmt::Display for ValidationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "invalid validation scope '{}', expected one of: HOST, WILDCARD, DOMAIN",
                    s
                )
            })
    }
}

/// Validation state of a domain on the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationStatus {
    RequestAccepted,
    ValidationInProgress,
    Validated,
    TokenExpired,
    Invalidated,
    Unknown(String),
}

impl ValidationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ValidationStatus::RequestAccepted => "REQUEST_ACCEPTED",
            ValidationStatus::ValidationInProgress => "VALIDATION_IN_PROGRESS",
            ValidationStatus::Validated => "VALIDATED",
            ValidationStatus::TokenExpired => "TOKEN_EXPIRED",
            ValidationStatus::Invalidated => "INVALIDATED",
            ValidationStatus::Unknown(s) => s,
        }
    }

    /// The server no longer honours this request; it has to be added again
    pub fn is_lapsed(&self) -> bool {
        matches!(
            self,
            ValidationStatus::TokenExpired | ValidationStatus::Invalidated
        )
    }
}

impl From<String> for ValidationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "REQUEST_ACCEPTED" => ValidationStatus::RequestAccepted,
            "VALIDATION_IN_PROGRESS" => ValidationStatus::ValidationInProgress,
            "VALIDATED" => ValidationStatus::Validated,
            "TOKEN_EXPIRED" => ValidationStatus::TokenExpired,
            "INVALIDATED" => ValidationStatus::Invalidated,
            _ => ValidationStatus::Unknown(s),
        }
    }
}

impl From<ValidationStatus> for String {
    fn from(status: ValidationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a search hit is the domain itself or a covering root/wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationLevel {
    Fqdn,
    RootOrWildcard,
    Unknown(String),
}

impl From<String> for ValidationLevel {
    fn from(s: String) -> Self {
        match s.as_str() {
            "FQDN" => ValidationLevel::Fqdn,
            "ROOT/WILDCARD" => ValidationLevel::RootOrWildcard,
            _ => ValidationLevel::Unknown(s),
        }
    }
}

impl From<ValidationLevel> for String {
    fn from(level: ValidationLevel) -> Self {
        match level {
            ValidationLevel::Fqdn => "FQDN".to_string(),
            ValidationLevel::RootOrWildcard => "ROOT/WILDCARD".to_string(),
            ValidationLevel::Unknown(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationMethod {
    DnsCname,
    DnsTxt,
    Http,
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationMethod::DnsCname => "DNS_CNAME",
            ValidationMethod::DnsTxt => "DNS_TXT",
            ValidationMethod::Http => "HTTP",
        })
    }
}

/// Natural key of a domain: name plus validation scope
///
/// Ordered by name, then scope. Names are kept lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainKey {
    pub domain_name: String,
    pub validation_scope: ValidationScope,
}

impl DomainKey {
    pub fn new(domain_name: impl AsRef<str>, validation_scope: ValidationScope) -> Self {
        Self {
            domain_name: domain_name.as_ref().trim().to_ascii_lowercase(),
            validation_scope,
        }
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain_name, self.validation_scope)
    }
}

/// Search criterion; an unset scope matches every scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainQuery {
    pub domain_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_scope: Option<ValidationScope>,
}

impl From<&DomainKey> for DomainQuery {
    fn from(key: &DomainKey) -> Self {
        Self {
            domain_name: key.domain_name.clone(),
            validation_scope: Some(key.validation_scope),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnameRecord {
    pub name: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtRecord {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpFile {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRedirect {
    pub from: String,
    pub to: String,
}

/// What the user has to publish to prove ownership
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationChallenge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname_record: Option<CnameRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txt_record: Option<TxtRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_file: Option<HttpFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_redirect: Option<HttpRedirect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
}

/// A domain as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub domain_name: String,
    pub validation_scope: ValidationScope,
    #[serde(default)]
    pub domain_status: Option<ValidationStatus>,
    #[serde(default)]
    pub validation_level: Option<ValidationLevel>,
    #[serde(default)]
    pub validation_method: Option<ValidationMethod>,
    #[serde(default)]
    pub validation_requested_by: Option<String>,
    #[serde(default)]
    pub validation_requested_date: Option<String>,
    #[serde(default)]
    pub validation_completed_date: Option<String>,
    #[serde(default)]
    pub validation_challenge: Option<ValidationChallenge>,
}

impl Domain {
    pub fn key(&self) -> DomainKey {
        DomainKey::new(&self.domain_name, self.validation_scope)
    }

    /// The hit describes this exact name rather than a covering domain
    pub fn is_fqdn(&self) -> bool {
        !matches!(self.validation_level, Some(ValidationLevel::RootOrWildcard))
    }

    pub fn is_validated(&self) -> bool {
        self.domain_status == Some(ValidationStatus::Validated)
    }

    /// Search returned a real entry rather than an empty placeholder
    pub fn exists(&self) -> bool {
        self.domain_status.is_some()
    }
}

/// Per-domain failure inside a batch call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainError {
    pub domain_name: String,
    pub validation_scope: ValidationScope,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: Option<String>,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.domain_name, self.validation_scope, self.title
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Outcome of a batch add/delete/validate/invalidate call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub successes: Vec<Domain>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<DomainError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_from_search_result() {
        let json = r#"{
            "domainName": "www.example.com",
            "validationScope": "HOST",
            "domainStatus": "VALIDATION_IN_PROGRESS",
            "validationLevel": "FQDN",
            "validationMethod": "DNS_CNAME",
            "validationChallenge": {
                "cnameRecord": {"name": "_acme-challenge.www.example.com", "target": "ac.1234.edgekey.net"},
                "txtRecord": {"name": "_akamai.www.example.com", "value": "token"},
                "httpFile": {"path": "/.well-known/akamai.txt", "content": "token", "contentType": "text/plain"},
                "expirationDate": "2025-01-01T00:00:00Z"
            }
        }"#;
        let domain: Domain = serde_json::from_str(json).unwrap();
        assert_eq!(
            domain.key(),
            DomainKey::new("www.example.com", ValidationScope::Host)
        );
        assert!(domain.is_fqdn());
        assert!(!domain.is_validated());
        let challenge = domain.validation_challenge.unwrap();
        assert_eq!(
            challenge.cname_record.unwrap().target,
            "ac.1234.edgekey.net"
        );
        assert_eq!(
            challenge.http_file.unwrap().content_type.as_deref(),
            Some("text/plain")
        );
    }

    #[test]
    fn test_root_wildcard_level() {
        let level: ValidationLevel = serde_json::from_str(r#""ROOT/WILDCARD""#).unwrap();
        assert_eq!(level, ValidationLevel::RootOrWildcard);
        assert_eq!(serde_json::to_string(&level).unwrap(), r#""ROOT/WILDCARD""#);
    }

    #[test]
    fn test_keys_order_by_name_then_scope() {
        let mut keys = vec![
            DomainKey::new("b.com", ValidationScope::Host),
            DomainKey::new("A.com", ValidationScope::Wildcard),
            DomainKey::new("a.com", ValidationScope::Host),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["a.com:HOST", "a.com:WILDCARD", "b.com:HOST"]);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!(
            "wildcard".parse::<ValidationScope>(),
            Ok(ValidationScope::Wildcard)
        );
        assert!("ZONE".parse::<ValidationScope>().is_err());
    }

    #[test]
    fn test_batch_result_tolerates_nulls() {
        let result: BatchResult =
            serde_json::from_str(r#"{"successes": null, "errors": [{"domainName": "a.com", "validationScope": "HOST", "title": "Conflict"}]}"#)
                .unwrap();
        assert!(result.successes.is_empty());
        assert_eq!(result.errors[0].to_string(), "a.com:HOST: Conflict");
    }
}
