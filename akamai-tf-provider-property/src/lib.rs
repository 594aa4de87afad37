//! Akamai TF Property Provider
//!
//! Property Manager (PAPI) resources: property and include activations,
//! the hostnames of a property version, and rule-tree comparison. Every
//! resource talks to PAPI through an injected [`PapiApi`].

pub mod activation;
pub mod api;
pub mod client;
pub mod compliance;
pub mod hostnames;
pub mod include_activation;
pub mod models;
pub mod property_activation;
pub mod request;
pub mod rules;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use akamai_tf_core::provider::Provider;
use akamai_tf_edgegrid::EdgeGridClient;

pub use api::PapiApi;
pub use client::HttpPapiClient;
pub use hostnames::{HostnamesDiffDataSource, PropertyHostnamesResource};
pub use include_activation::IncludeActivationResource;
pub use property_activation::{PropertyActivationDataSource, PropertyActivationResource};
pub use rules::{PropertyRulesDataSource, rule_trees_json_equivalent, rules_equal};

/// Entry point that hands out the PAPI resources and data sources
pub struct PropertyProvider {
    api: Arc<dyn PapiApi>,
}

impl PropertyProvider {
    pub fn new(api: Arc<dyn PapiApi>) -> Self {
        Self { api }
    }

    /// Provider backed by the signed HTTP client
    pub fn from_client(client: EdgeGridClient) -> Self {
        Self::new(Arc::new(HttpPapiClient::new(client)))
    }

    pub fn property_activation(&self) -> PropertyActivationResource {
        PropertyActivationResource::new(self.api.clone())
    }

    pub fn include_activation(&self) -> IncludeActivationResource {
        IncludeActivationResource::new(self.api.clone())
    }

    pub fn hostnames(&self) -> PropertyHostnamesResource {
        PropertyHostnamesResource::new(self.api.clone())
    }

    pub fn activation_data_source(&self) -> PropertyActivationDataSource {
        PropertyActivationDataSource::new(self.api.clone())
    }

    pub fn hostnames_diff(&self) -> HostnamesDiffDataSource {
        HostnamesDiffDataSource::new(self.api.clone())
    }

    pub fn rules(&self) -> PropertyRulesDataSource {
        PropertyRulesDataSource::new(self.api.clone())
    }
}

impl Provider for PropertyProvider {
    fn name(&self) -> &'static str {
        "property"
    }

    fn resource_types(&self) -> Vec<&'static str> {
        vec![
            "akamai_property_activation",
            "akamai_property_include_activation",
            "akamai_property_hostnames",
        ]
    }

    fn data_source_types(&self) -> Vec<&'static str> {
        vec![
            "akamai_property_activation",
            "akamai_property_hostnames_diff",
            "akamai_property_rules",
        ]
    }
}
