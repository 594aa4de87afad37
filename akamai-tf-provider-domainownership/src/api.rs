//! DomainOwnershipApi - Domain validation calls used by the resources

use async_trait::async_trait;

use akamai_tf_core::{ProviderError, ProviderResult};

use crate::models::{BatchResult, Domain, DomainKey, DomainQuery, ValidationMethod};

/// Batch calls of the domain validation API
///
/// `search_domains` accepts at most [`crate::search::SEARCH_CHUNK_SIZE`]
/// queries per call; use [`crate::search::search_all`] for longer lists.
#[async_trait]
pub trait DomainOwnershipApi: Send + Sync {
    async fn search_domains(&self, queries: &[DomainQuery]) -> ProviderResult<Vec<Domain>>;

    async fn add_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult>;

    async fn delete_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult>;

    async fn validate_domains(
        &self,
        domains: &[(DomainKey, ValidationMethod)],
    ) -> ProviderResult<BatchResult>;

    async fn invalidate_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult>;
}

/// Turn per-domain failures of a batch call into one error
pub(crate) fn check_batch(operation: &str, result: BatchResult) -> ProviderResult<Vec<Domain>> {
    if result.errors.is_empty() {
        return Ok(result.successes);
    }
    let failures: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
    Err(ProviderError::new(format!(
        "{} failed for {} domains: {}",
        operation,
        failures.len(),
        failures.join("; ")
    )))
}
