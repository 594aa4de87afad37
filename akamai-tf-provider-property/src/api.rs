//! PapiApi - The Property Manager calls the resources depend on
//!
//! Resources receive an `Arc<dyn PapiApi>`; the HTTP implementation lives in
//! `client`, tests use in-memory fakes.

use async_trait::async_trait;

use akamai_tf_core::ProviderResult;

use crate::models::{
    Hostname, HostnameDiffPage, IncludeActivation, IncludeRef, PropertyActivation, PropertyRef,
};
use crate::request::ActivationRequest;
use crate::rules::RuleTree;

#[async_trait]
pub trait PapiApi: Send + Sync {
    async fn list_property_activations(
        &self,
        property: &PropertyRef,
    ) -> ProviderResult<Vec<PropertyActivation>>;

    /// Submit an activation and return its ID
    async fn create_property_activation(
        &self,
        property: &PropertyRef,
        request: &ActivationRequest,
    ) -> ProviderResult<String>;

    /// `Ok(None)` when the activation is not visible (yet)
    async fn get_property_activation(
        &self,
        property: &PropertyRef,
        activation_id: &str,
    ) -> ProviderResult<Option<PropertyActivation>>;

    async fn list_include_activations(
        &self,
        include: &IncludeRef,
    ) -> ProviderResult<Vec<IncludeActivation>>;

    async fn create_include_activation(
        &self,
        include: &IncludeRef,
        request: &ActivationRequest,
    ) -> ProviderResult<String>;

    async fn get_include_activation(
        &self,
        include: &IncludeRef,
        activation_id: &str,
    ) -> ProviderResult<Option<IncludeActivation>>;

    /// `Ok(None)` when the property version does not exist
    async fn get_version_hostnames(
        &self,
        property: &PropertyRef,
        version: u32,
    ) -> ProviderResult<Option<Vec<Hostname>>>;

    /// Replace the whole hostname list of a version
    async fn put_version_hostnames(
        &self,
        property: &PropertyRef,
        version: u32,
        hostnames: &[Hostname],
    ) -> ProviderResult<Vec<Hostname>>;

    async fn hostnames_diff_page(
        &self,
        property: &PropertyRef,
        offset: usize,
        limit: usize,
    ) -> ProviderResult<HostnameDiffPage>;

    async fn get_rule_tree(&self, property: &PropertyRef, version: u32)
    -> ProviderResult<RuleTree>;
}
