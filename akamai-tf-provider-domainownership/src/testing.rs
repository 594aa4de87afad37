//! In-memory domain validation API used by the unit tests

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use akamai_tf_core::ProviderResult;

use crate::api::DomainOwnershipApi;
use crate::models::{
    BatchResult, Domain, DomainError, DomainKey, DomainQuery, TxtRecord, ValidationChallenge,
    ValidationLevel, ValidationMethod, ValidationStatus,
};

#[derive(Default)]
struct Inner {
    domains: Vec<Domain>,
    rejected: BTreeMap<DomainKey, String>,
    /// Statuses handed out by searches after validate-now; the last one sticks
    scripts: BTreeMap<DomainKey, VecDeque<ValidationStatus>>,
    armed: BTreeSet<DomainKey>,
    searches: Vec<usize>,
    added: Vec<Vec<DomainKey>>,
    deleted: Vec<Vec<DomainKey>>,
    validated: Vec<Vec<(DomainKey, ValidationMethod)>>,
    invalidated: Vec<Vec<DomainKey>>,
}

impl Inner {
    fn fqdn_mut(&mut self, key: &DomainKey) -> Option<&mut Domain> {
        self.domains
            .iter_mut()
            .find(|d| d.key() == *key && d.is_fqdn())
    }

    fn advance(&mut self, key: &DomainKey) {
        if !self.armed.contains(key) {
            return;
        }
        let Some(script) = self.scripts.get_mut(key) else {
            return;
        };
        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        if let (Some(status), Some(domain)) = (status, self.fqdn_mut(key)) {
            domain.domain_status = Some(status);
        }
    }
}

fn entry(key: &DomainKey, level: ValidationLevel, status: ValidationStatus) -> Domain {
    Domain {
        domain_name: key.domain_name.clone(),
        validation_scope: key.validation_scope,
        domain_status: Some(status),
        validation_level: Some(level),
        validation_method: None,
        validation_requested_by: Some("tester".to_string()),
        validation_requested_date: Some("2030-01-01T00:00:00Z".to_string()),
        validation_completed_date: None,
        validation_challenge: Some(ValidationChallenge {
            txt_record: Some(TxtRecord {
                name: format!("_akamai-challenge.{}", key.domain_name),
                value: "token".to_string(),
            }),
            ..ValidationChallenge::default()
        }),
    }
}

#[derive(Default)]
pub(crate) struct FakeDomainOwnership {
    inner: Mutex<Inner>,
}

impl FakeDomainOwnership {
    fn state(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub(crate) fn seed_validated(&self, key: DomainKey) {
        let domain = entry(&key, ValidationLevel::Fqdn, ValidationStatus::Validated);
        self.state().domains.push(domain);
    }

    pub(crate) fn seed_pending(&self, key: DomainKey, method: ValidationMethod) {
        let mut domain = entry(&key, ValidationLevel::Fqdn, ValidationStatus::RequestAccepted);
        domain.validation_method = Some(method);
        self.state().domains.push(domain);
    }

    /// A validated root or wildcard that already covers `key`
    pub(crate) fn seed_covering(&self, key: DomainKey) {
        let domain = entry(&key, ValidationLevel::RootOrWildcard, ValidationStatus::Validated);
        self.state().domains.push(domain);
    }

    pub(crate) fn reject_add(&self, key: DomainKey, title: &str) {
        self.state().rejected.insert(key, title.to_string());
    }

    pub(crate) fn script_statuses(&self, key: DomainKey, statuses: Vec<ValidationStatus>) {
        self.state().scripts.insert(key, statuses.into());
    }

    pub(crate) fn remove(&self, key: &DomainKey) {
        self.state().domains.retain(|d| d.key() != *key);
    }

    pub(crate) fn contains(&self, key: &DomainKey) -> bool {
        self.state().domains.iter().any(|d| d.key() == *key)
    }

    pub(crate) fn search_sizes(&self) -> Vec<usize> {
        self.state().searches.clone()
    }

    pub(crate) fn added(&self) -> Vec<Vec<DomainKey>> {
        self.state().added.clone()
    }

    pub(crate) fn deleted(&self) -> Vec<Vec<DomainKey>> {
        self.state().deleted.clone()
    }

    pub(crate) fn validated(&self) -> Vec<Vec<(DomainKey, ValidationMethod)>> {
        self.state().validated.clone()
    }

    pub(crate) fn invalidated(&self) -> Vec<Vec<DomainKey>> {
        self.state().invalidated.clone()
    }
}

#[async_trait]
impl DomainOwnershipApi for FakeDomainOwnership {
    async fn search_domains(&self, queries: &[DomainQuery]) -> ProviderResult<Vec<Domain>> {
        let mut inner = self.state();
        inner.searches.push(queries.len());
        let mut found = Vec::new();
        for query in queries {
            let keys: Vec<DomainKey> = inner
                .domains
                .iter()
                .map(Domain::key)
                .filter(|k| k.domain_name == query.domain_name)
                .filter(|k| query.validation_scope.is_none_or(|s| s == k.validation_scope))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for key in &keys {
                inner.advance(key);
            }
            found.extend(inner.domains.iter().filter(|d| keys.contains(&d.key())).cloned());
        }
        Ok(found)
    }

    async fn add_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult> {
        let mut inner = self.state();
        inner.added.push(domains.to_vec());
        let mut result = BatchResult::default();
        for key in domains {
            if let Some(title) = inner.rejected.get(key) {
                result.errors.push(DomainError {
                    domain_name: key.domain_name.clone(),
                    validation_scope: key.validation_scope,
                    title: title.clone(),
                    detail: None,
                });
                continue;
            }
            let domain = entry(key, ValidationLevel::Fqdn, ValidationStatus::RequestAccepted);
            inner.domains.retain(|d| !(d.key() == *key && d.is_fqdn()));
            inner.domains.push(domain.clone());
            result.successes.push(domain);
        }
        Ok(result)
    }

    async fn delete_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult> {
        let mut inner = self.state();
        inner.deleted.push(domains.to_vec());
        let mut result = BatchResult::default();
        for key in domains {
            if let Some(position) = inner
                .domains
                .iter()
                .position(|d| d.key() == *key && d.is_fqdn())
            {
                result.successes.push(inner.domains.remove(position));
            }
        }
        Ok(result)
    }

    async fn validate_domains(
        &self,
        domains: &[(DomainKey, ValidationMethod)],
    ) -> ProviderResult<BatchResult> {
        let mut inner = self.state();
        inner.validated.push(domains.to_vec());
        let mut result = BatchResult::default();
        for (key, method) in domains {
            inner.armed.insert(key.clone());
            if let Some(domain) = inner.fqdn_mut(key) {
                domain.domain_status = Some(ValidationStatus::ValidationInProgress);
                domain.validation_method = Some(*method);
                result.successes.push(domain.clone());
            }
        }
        Ok(result)
    }

    async fn invalidate_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult> {
        let mut inner = self.state();
        inner.invalidated.push(domains.to_vec());
        let mut result = BatchResult::default();
        for key in domains {
            if let Some(domain) = inner.fqdn_mut(key) {
                domain.domain_status = Some(ValidationStatus::Invalidated);
                result.successes.push(domain.clone());
            }
        }
        Ok(result)
    }
}
