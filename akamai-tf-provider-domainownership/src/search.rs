//! Chunked domain search

use akamai_tf_core::ProviderResult;
use log::debug;

use crate::api::DomainOwnershipApi;
use crate::models::{Domain, DomainQuery};

/// Largest number of domains accepted by one search request
pub const SEARCH_CHUNK_SIZE: usize = 1000;

/// Search any number of domains, results concatenated in submission order
pub async fn search_all(
    api: &dyn DomainOwnershipApi,
    queries: &[DomainQuery],
) -> ProviderResult<Vec<Domain>> {
    let mut found = Vec::with_capacity(queries.len());
    for (i, chunk) in queries.chunks(SEARCH_CHUNK_SIZE).enumerate() {
        debug!("searching domains: chunk {} ({} domains)", i + 1, chunk.len());
        found.extend(api.search_domains(chunk).await?);
    }
    Ok(found)
}
