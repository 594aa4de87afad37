//! Akamai TF Domain Ownership Provider
//!
//! Resources for proving ownership of domains before they are served:
//! submitting domains, triggering validation of the published challenges
//! and searching what the server already knows about. Every resource talks
//! to the API through an injected [`DomainOwnershipApi`].

pub mod api;
pub mod client;
pub mod data_source;
pub mod domains;
pub mod import_id;
pub mod models;
pub mod reconcile;
pub mod search;
pub mod validation;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use akamai_tf_core::provider::Provider;
use akamai_tf_edgegrid::EdgeGridClient;

pub use api::DomainOwnershipApi;
pub use client::HttpDomainOwnershipClient;
pub use data_source::SearchDomainsDataSource;
pub use domains::DomainsResource;
pub use reconcile::{Reconciliation, reconcile};
pub use validation::DomainValidationResource;

/// Entry point that hands out the domain ownership resources
pub struct DomainOwnershipProvider {
    api: Arc<dyn DomainOwnershipApi>,
}

impl DomainOwnershipProvider {
    pub fn new(api: Arc<dyn DomainOwnershipApi>) -> Self {
        Self { api }
    }

    /// Provider backed by the signed HTTP client
    pub fn from_client(client: EdgeGridClient) -> Self {
        Self::new(Arc::new(HttpDomainOwnershipClient::new(client)))
    }

    pub fn domains(&self) -> DomainsResource {
        DomainsResource::new(self.api.clone())
    }

    pub fn validation(&self) -> DomainValidationResource {
        DomainValidationResource::new(self.api.clone())
    }

    pub fn search(&self) -> SearchDomainsDataSource {
        SearchDomainsDataSource::new(self.api.clone())
    }
}

impl Provider for DomainOwnershipProvider {
    fn name(&self) -> &'static str {
        "domainownership"
    }

    fn resource_types(&self) -> Vec<&'static str> {
        vec![
            "akamai_property_domainownership_domains",
            "akamai_property_domainownership_validation",
        ]
    }

    fn data_source_types(&self) -> Vec<&'static str> {
        vec!["akamai_property_domainownership_search_domains"]
    }
}
