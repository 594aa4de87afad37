//! Import IDs of the form `domain[:scope](,domain[:scope])*`
//!
//! A scope may be left out when the server knows the domain under exactly
//! one scope; it is then filled in from a search.

use std::collections::BTreeSet;

use akamai_tf_core::ProviderError;

use crate::models::{Domain, DomainKey, DomainQuery, ValidationScope};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainImportError {
    #[error("invalid import ID '{0}': expected domain[:scope](,domain[:scope])*")]
    Malformed(String),

    #[error("invalid import ID '{id}': entry {position} is empty")]
    EmptyEntry { id: String, position: usize },

    #[error("invalid import ID '{id}': {reason}")]
    InvalidScope { id: String, reason: String },

    #[error("domain {0} is listed more than once in the import ID")]
    Duplicate(String),

    #[error("domain {domain} exists with several validation scopes ({scopes}); specify one as domain:scope")]
    Ambiguous { domain: String, scopes: String },

    #[error("domain {0} was not found")]
    NotFound(String),
}

impl From<DomainImportError> for ProviderError {
    fn from(err: DomainImportError) -> Self {
        match err {
            DomainImportError::NotFound(_) => ProviderError::not_found(err.to_string()),
            _ => ProviderError::validation(err.to_string()),
        }
    }
}

/// Parse an import ID into search criteria, one per listed domain
pub fn parse_import_id(id: &str) -> Result<Vec<DomainQuery>, DomainImportError> {
    if id.trim().is_empty() {
        return Err(DomainImportError::Malformed(id.to_string()));
    }

    let mut queries = Vec::new();
    let mut seen = BTreeSet::new();
    for (i, entry) in id.split(',').enumerate() {
        let entry = entry.trim();
        let (name, scope) = match entry.split_once(':') {
            Some((name, scope)) => (name.trim(), Some(scope.trim())),
            None => (entry, None),
        };
        if name.is_empty() || scope.is_some_and(str::is_empty) {
            return Err(DomainImportError::EmptyEntry {
                id: id.to_string(),
                position: i + 1,
            });
        }
        let validation_scope = scope
            .map(|s| s.parse::<ValidationScope>())
            .transpose()
            .map_err(|reason| DomainImportError::InvalidScope {
                id: id.to_string(),
                reason,
            })?;

        let domain_name = name.to_ascii_lowercase();
        let label = match validation_scope {
            Some(scope) => format!("{}:{}", domain_name, scope),
            None => domain_name.clone(),
        };
        if !seen.insert(label.clone()) {
            return Err(DomainImportError::Duplicate(label));
        }
        queries.push(DomainQuery {
            domain_name,
            validation_scope,
        });
    }
    Ok(queries)
}

/// Pin every query to one FQDN-level server entry
///
/// Returns the keys sorted. Two entries that resolve to the same key (for
/// example `a.com` and `a.com:HOST`) are reported as duplicates.
pub fn resolve_import(
    queries: &[DomainQuery],
    found: &[Domain],
) -> Result<Vec<DomainKey>, DomainImportError> {
    let mut keys = BTreeSet::new();
    for query in queries {
        let matches: Vec<DomainKey> = found
            .iter()
            .filter(|d| d.exists() && d.is_fqdn())
            .map(Domain::key)
            .filter(|k| k.domain_name == query.domain_name)
            .filter(|k| query.validation_scope.is_none_or(|s| s == k.validation_scope))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let key = match matches.as_slice() {
            [] => {
                let label = match query.validation_scope {
                    Some(scope) => format!("{}:{}", query.domain_name, scope),
                    None => query.domain_name.clone(),
                };
                return Err(DomainImportError::NotFound(label));
            }
            [only] => only.clone(),
            several => {
                let scopes: Vec<&str> = several
                    .iter()
                    .map(|k| k.validation_scope.as_str())
                    .collect();
                return Err(DomainImportError::Ambiguous {
                    domain: query.domain_name.clone(),
                    scopes: scopes.join(", "),
                });
            }
        };
        if !keys.insert(key.clone()) {
            return Err(DomainImportError::Duplicate(key.to_string()));
        }
    }
    Ok(keys.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ValidationLevel, ValidationStatus};
    use crate::reconcile::tests::domain;

    fn scoped(name: &str, scope: ValidationScope) -> Domain {
        Domain {
            validation_scope: scope,
            ..domain(name, ValidationLevel::Fqdn, ValidationStatus::Validated)
        }
    }

    #[test]
    fn test_parse_mixed_entries() {
        let queries = parse_import_id("WWW.example.com:host, api.example.com").unwrap();
        assert_eq!(
            queries,
            vec![
                DomainQuery {
                    domain_name: "www.example.com".to_string(),
                    validation_scope: Some(ValidationScope::Host),
                },
                DomainQuery {
                    domain_name: "api.example.com".to_string(),
                    validation_scope: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            parse_import_id(""),
            Err(DomainImportError::Malformed(_))
        ));
        assert!(matches!(
            parse_import_id("a.com,,b.com"),
            Err(DomainImportError::EmptyEntry { position: 2, .. })
        ));
        assert!(matches!(
            parse_import_id("a.com:"),
            Err(DomainImportError::EmptyEntry { position: 1, .. })
        ));
        assert!(matches!(
            parse_import_id("a.com:ZONE"),
            Err(DomainImportError::InvalidScope { .. })
        ));
        assert_eq!(
            parse_import_id("a.com:HOST,A.com:host"),
            Err(DomainImportError::Duplicate("a.com:HOST".to_string()))
        );
    }

    #[test]
    fn test_unscoped_domain_resolves_to_its_only_scope() {
        let queries = parse_import_id("example.com").unwrap();
        let found = vec![scoped("example.com", ValidationScope::Domain)];
        assert_eq!(
            resolve_import(&queries, &found).unwrap(),
            vec![DomainKey::new("example.com", ValidationScope::Domain)]
        );
    }

    #[test]
    fn test_unscoped_domain_with_several_scopes_is_ambiguous() {
        let queries = parse_import_id("example.com").unwrap();
        let found = vec![
            scoped("example.com", ValidationScope::Host),
            scoped("example.com", ValidationScope::Wildcard),
        ];
        let err = resolve_import(&queries, &found).unwrap_err();
        assert_eq!(
            err.to_string(),
            "domain example.com exists with several validation scopes (HOST, WILDCARD); specify one as domain:scope"
        );
    }

    #[test]
    fn test_covering_entries_do_not_count() {
        let queries = parse_import_id("www.example.com").unwrap();
        let found = vec![domain(
            "www.example.com",
            ValidationLevel::RootOrWildcard,
            ValidationStatus::Validated,
        )];
        assert_eq!(
            resolve_import(&queries, &found),
            Err(DomainImportError::NotFound("www.example.com".to_string()))
        );
    }

    #[test]
    fn test_same_key_twice_after_resolution() {
        let queries = parse_import_id("a.com,a.com:HOST").unwrap();
        let found = vec![scoped("a.com", ValidationScope::Host)];
        assert_eq!(
            resolve_import(&queries, &found),
            Err(DomainImportError::Duplicate("a.com:HOST".to_string()))
        );
    }
}
