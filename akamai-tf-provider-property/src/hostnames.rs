//! akamai_property_hostnames resource and akamai_property_hostnames_diff data source
//!
//! PAPI replaces the whole hostname list of a version in one call. The
//! resource still diffs locally so that it can skip no-op updates and log
//! what a replace is going to change.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use akamai_tf_core::differ::{Diff, DiffSummary, diff_by_key};
use akamai_tf_core::provider::{Applied, DataSource, Identified, ResourceHandler};
use akamai_tf_core::resource::{join_id, split_id};
use akamai_tf_core::validation::{Validate, ValidationError, require_non_empty};
use akamai_tf_core::{Diagnostics, OperationContext, ProviderError, ProviderResult};

use crate::api::PapiApi;
use crate::models::{Hostname, HostnameDiffItem, PropertyRef};

/// Page size of the hostnames diff listing
pub const DIFF_PAGE_SIZE: usize = 999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyHostnamesConfig {
    pub property_id: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    pub version: u32,
    pub hostnames: Vec<Hostname>,
}

impl PropertyHostnamesConfig {
    fn property(&self) -> PropertyRef {
        PropertyRef::new(self.property_id.as_str())
            .with_contract(self.contract_id.clone(), self.group_id.clone())
    }
}

impl Validate for PropertyHostnamesConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        require_non_empty("property_id", &self.property_id, &mut errors);
        if self.version < 1 {
            errors.push(ValidationError::invalid(
                "version",
                self.version.to_string(),
                "must be 1 or greater",
            ));
        }
        let mut seen = BTreeSet::new();
        for hostname in &self.hostnames {
            require_non_empty("hostnames.cname_from", &hostname.cname_from, &mut errors);
            if hostname.cname_to.is_none() && hostname.edge_hostname_id.is_none() {
                errors.push(ValidationError::invalid(
                    "hostnames",
                    hostname.cname_from.as_str(),
                    "either cname_to or edge_hostname_id is required",
                ));
            }
            if !seen.insert(hostname.key()) {
                errors.push(ValidationError::invalid(
                    "hostnames.cname_from",
                    hostname.cname_from.as_str(),
                    "listed more than once",
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyHostnamesState {
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub version: u32,
    pub hostnames: Vec<Hostname>,
}

impl PropertyHostnamesState {
    fn property(&self) -> PropertyRef {
        PropertyRef::new(self.property_id.as_str())
            .with_contract(self.contract_id.clone(), self.group_id.clone())
    }
}

impl Identified for PropertyHostnamesState {
    fn id(&self) -> String {
        join_id(&[&self.property_id, &self.version.to_string()], ':')
    }
}

/// Compare the server's list with the desired one
pub fn diff_hostnames(current: &[Hostname], desired: &[Hostname]) -> Vec<Diff<Hostname>> {
    diff_by_key(current, desired, Hostname::key)
}

pub struct PropertyHostnamesResource {
    api: Arc<dyn PapiApi>,
}

impl PropertyHostnamesResource {
    pub fn new(api: Arc<dyn PapiApi>) -> Self {
        Self { api }
    }

    async fn current(&self, property: &PropertyRef, version: u32) -> ProviderResult<Vec<Hostname>> {
        self.api
            .get_version_hostnames(property, version)
            .await?
            .ok_or_else(|| {
                ProviderError::not_found(format!(
                    "property {} has no version {}",
                    property.property_id, version
                ))
            })
    }

    async fn apply(
        &self,
        config: &PropertyHostnamesConfig,
    ) -> ProviderResult<Applied<PropertyHostnamesState>> {
        config.ensure_valid()?;
        let property = config.property();
        let current = self.current(&property, config.version).await?;
        let diffs = diff_hostnames(&current, &config.hostnames);
        let summary = DiffSummary::of(&diffs);

        let hostnames = if summary.is_empty() {
            debug!(
                "{} version {}: hostnames up to date",
                property.property_id, config.version
            );
            current
        } else {
            for diff in diffs.iter().filter(|d| d.is_change()) {
                match diff {
                    Diff::Create(h) => debug!("  + {}", h.cname_from),
                    Diff::Update { to, .. } => debug!("  ~ {}", to.cname_from),
                    Diff::Delete(h) => debug!("  - {}", h.cname_from),
                    Diff::NoChange(_) => {}
                }
            }
            info!(
                "{} version {}: replacing hostnames ({})",
                property.property_id, config.version, summary
            );
            self.api
                .put_version_hostnames(&property, config.version, &config.hostnames)
                .await?
        };

        Ok(Applied::new(PropertyHostnamesState {
            property_id: property.property_id,
            contract_id: property.contract_id,
            group_id: property.group_id,
            version: config.version,
            hostnames,
        }))
    }
}

#[async_trait]
impl ResourceHandler for PropertyHostnamesResource {
    type Config = PropertyHostnamesConfig;
    type State = PropertyHostnamesState;

    fn type_name(&self) -> &'static str {
        "akamai_property_hostnames"
    }

    async fn plan(
        &self,
        _ctx: &OperationContext,
        _prior: Option<&PropertyHostnamesState>,
        config: &PropertyHostnamesConfig,
    ) -> ProviderResult<Diagnostics> {
        config.ensure_valid()?;
        Ok(Diagnostics::new())
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        config: &PropertyHostnamesConfig,
    ) -> ProviderResult<Applied<PropertyHostnamesState>> {
        ctx.run(self.apply(config))
            .await
            .map_err(|i| ProviderError::interrupted("hostnames update", i))?
    }

    async fn read(
        &self,
        _ctx: &OperationContext,
        state: &PropertyHostnamesState,
    ) -> ProviderResult<Option<PropertyHostnamesState>> {
        let hostnames = self
            .api
            .get_version_hostnames(&state.property(), state.version)
            .await?;
        Ok(hostnames.map(|hostnames| PropertyHostnamesState {
            hostnames,
            ..state.clone()
        }))
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &PropertyHostnamesState,
        config: &PropertyHostnamesConfig,
    ) -> ProviderResult<Applied<PropertyHostnamesState>> {
        if config.property().property_id != prior.property_id || config.version != prior.version {
            return Err(ProviderError::validation(format!(
                "changing property_id or version of {} requires replacing the resource",
                prior.id()
            )));
        }
        self.create(ctx, config).await
    }

    /// Remove the hostnames this resource manages, keeping any others
    async fn delete(
        &self,
        _ctx: &OperationContext,
        state: &PropertyHostnamesState,
    ) -> ProviderResult<Diagnostics> {
        let property = state.property();
        let Some(current) = self
            .api
            .get_version_hostnames(&property, state.version)
            .await?
        else {
            return Ok(Diagnostics::new());
        };

        let managed: BTreeSet<String> = state.hostnames.iter().map(Hostname::key).collect();
        let remaining: Vec<Hostname> = current
            .iter()
            .filter(|h| !managed.contains(&h.key()))
            .cloned()
            .collect();
        if remaining.len() != current.len() {
            info!(
                "{}: removing {} hostnames",
                state.id(),
                current.len() - remaining.len()
            );
            self.api
                .put_version_hostnames(&property, state.version, &remaining)
                .await?;
        }
        Ok(Diagnostics::new())
    }

    async fn import(
        &self,
        _ctx: &OperationContext,
        id: &str,
    ) -> ProviderResult<PropertyHostnamesState> {
        let parts = split_id(id, ':', 2, "propertyID:version")
            .map_err(|e| ProviderError::validation(e.to_string()))?;
        let version: u32 = parts[1].parse().map_err(|_| {
            ProviderError::validation(format!(
                "invalid import ID '{}': version is not a number",
                id
            ))
        })?;
        let property = PropertyRef::new(parts[0].as_str());
        let hostnames = self.current(&property, version).await?;
        Ok(PropertyHostnamesState {
            property_id: property.property_id,
            contract_id: None,
            group_id: None,
            version,
            hostnames,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostnamesDiffQuery {
    pub property_id: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostnamesDiffOutput {
    pub property_id: String,
    pub hostnames: Vec<HostnameDiffItem>,
}

/// Staging vs production hostnames of a property, fetched page by page
pub struct HostnamesDiffDataSource {
    api: Arc<dyn PapiApi>,
    page_size: usize,
}

impl HostnamesDiffDataSource {
    pub fn new(api: Arc<dyn PapiApi>) -> Self {
        Self {
            api,
            page_size: DIFF_PAGE_SIZE,
        }
    }
}

#[async_trait]
impl DataSource for HostnamesDiffDataSource {
    type Query = HostnamesDiffQuery;
    type Output = HostnamesDiffOutput;

    fn type_name(&self) -> &'static str {
        "akamai_property_hostnames_diff"
    }

    async fn read(
        &self,
        ctx: &OperationContext,
        query: &HostnamesDiffQuery,
    ) -> ProviderResult<HostnamesDiffOutput> {
        let property = PropertyRef::new(query.property_id.as_str())
            .with_contract(query.contract_id.clone(), query.group_id.clone());

        let mut hostnames = Vec::new();
        loop {
            ctx.check()
                .map_err(|i| ProviderError::interrupted("hostnames diff listing", i))?;
            let page = self
                .api
                .hostnames_diff_page(&property, hostnames.len(), self.page_size)
                .await?;
            if page.items.is_empty() {
                break;
            }
            hostnames.extend(page.items);
            if hostnames.len() >= page.total_items {
                break;
            }
        }

        Ok(HostnamesDiffOutput {
            property_id: property.property_id,
            hostnames,
        })
    }
}
