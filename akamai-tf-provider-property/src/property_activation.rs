//! akamai_property_activation resource and data source

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use akamai_tf_core::poll::PollOptions;
use akamai_tf_core::provider::{Applied, DataSource, Identified, ResourceHandler};
use akamai_tf_core::resource::{Timeouts, join_id, split_id};
use akamai_tf_core::validation::{Validate, ValidationError, into_provider_error, require_non_empty};
use akamai_tf_core::{Diagnostics, OperationContext, ProviderError, ProviderResult};

use crate::activation::{
    ActivationTarget, LookupError, apply_activation, current_activation, find_latest_activation,
};
use crate::api::PapiApi;
use crate::compliance::ComplianceRecord;
use crate::models::{
    ActivationRecord, ActivationStatus, ActivationType, Network, PropertyActivation, PropertyRef,
};
use crate::request::{ActivationRequest, ActivationSettings, build_activation_request};

/// Default wait between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Default wait while a new activation is not visible yet
pub const DEFAULT_NOT_FOUND_INTERVAL: Duration = Duration::from_secs(10);
/// Default limit for create, update and delete
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90 * 60);

pub fn default_poll_options() -> PollOptions {
    PollOptions::new(DEFAULT_POLL_INTERVAL, DEFAULT_NOT_FOUND_INTERVAL)
}

pub(crate) fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyActivationConfig {
    pub property_id: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    pub version: u32,
    #[serde(default)]
    pub network: Network,
    /// Notification emails
    pub contact: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default = "default_true")]
    pub auto_acknowledge_rule_warnings: bool,
    #[serde(default)]
    pub compliance_record: Option<ComplianceRecord>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl PropertyActivationConfig {
    pub fn property(&self) -> PropertyRef {
        PropertyRef::new(self.property_id.as_str())
            .with_contract(self.contract_id.clone(), self.group_id.clone())
    }

    fn settings(&self) -> ActivationSettings<'_> {
        ActivationSettings {
            version: self.version,
            network: self.network,
            note: self.note.as_deref(),
            notify_emails: &self.contact,
            acknowledge_all_warnings: self.auto_acknowledge_rule_warnings,
            compliance_record: self.compliance_record.as_ref(),
        }
    }
}

impl Validate for PropertyActivationConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        require_non_empty("property_id", &self.property_id, &mut errors);
        self.settings().validate(&mut errors);
        self.timeouts.validate(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyActivationState {
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub network: Network,
    pub version: u32,
    pub activation_id: String,
    pub status: ActivationStatus,
    pub contact: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default = "default_true")]
    pub auto_acknowledge_rule_warnings: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_record: Option<ComplianceRecord>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl PropertyActivationState {
    fn property(&self) -> PropertyRef {
        PropertyRef::new(self.property_id.as_str())
            .with_contract(self.contract_id.clone(), self.group_id.clone())
    }

    /// Project a server record onto the state, keeping user-only settings
    fn project(config: &PropertyActivationConfig, record: &PropertyActivation) -> Self {
        let property = config.property();
        Self {
            property_id: property.property_id,
            contract_id: property.contract_id,
            group_id: property.group_id,
            network: record.network,
            version: record.version(),
            activation_id: record.activation_id.clone(),
            status: record.status.clone(),
            contact: config.contact.clone(),
            note: config.note.clone(),
            auto_acknowledge_rule_warnings: config.auto_acknowledge_rule_warnings,
            compliance_record: config.compliance_record.clone(),
            timeouts: config.timeouts,
        }
    }

    fn refreshed(&self, record: &PropertyActivation) -> Self {
        Self {
            version: record.version(),
            activation_id: record.activation_id.clone(),
            status: record.status.clone(),
            ..self.clone()
        }
    }
}

impl Identified for PropertyActivationState {
    fn id(&self) -> String {
        join_id(&[&self.property_id, self.network.as_str()], ':')
    }
}

/// Activation calls for one property
pub struct PropertyTarget {
    api: Arc<dyn PapiApi>,
    property: PropertyRef,
}

impl PropertyTarget {
    pub fn new(api: Arc<dyn PapiApi>, property: PropertyRef) -> Self {
        Self { api, property }
    }
}

#[async_trait]
impl ActivationTarget for PropertyTarget {
    type Record = PropertyActivation;

    fn describe(&self) -> String {
        format!("property {}", self.property.property_id)
    }

    async fn list(&self) -> ProviderResult<Vec<PropertyActivation>> {
        self.api.list_property_activations(&self.property).await
    }

    async fn submit(&self, request: &ActivationRequest) -> ProviderResult<String> {
        self.api
            .create_property_activation(&self.property, request)
            .await
    }

    async fn fetch(&self, activation_id: &str) -> ProviderResult<Option<PropertyActivation>> {
        self.api
            .get_property_activation(&self.property, activation_id)
            .await
    }
}

pub struct PropertyActivationResource {
    api: Arc<dyn PapiApi>,
    poll: PollOptions,
    default_timeout: Duration,
}

impl PropertyActivationResource {
    pub fn new(api: Arc<dyn PapiApi>) -> Self {
        Self {
            api,
            poll: default_poll_options(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn target(&self, property: PropertyRef) -> PropertyTarget {
        PropertyTarget::new(self.api.clone(), property)
    }

    async fn activate(
        &self,
        ctx: &OperationContext,
        config: &PropertyActivationConfig,
        timeout: Duration,
    ) -> ProviderResult<Applied<PropertyActivationState>> {
        config.ensure_valid()?;
        let (request, diagnostics) =
            build_activation_request(&config.settings(), ActivationType::Activate)
                .map_err(into_provider_error)?;

        let ctx = ctx.with_timeout(timeout);
        let target = self.target(config.property());
        let record = apply_activation(&ctx, &target, &request, self.poll).await?;

        Ok(
            Applied::new(PropertyActivationState::project(config, &record))
                .with_diagnostics(diagnostics),
        )
    }
}

#[async_trait]
impl ResourceHandler for PropertyActivationResource {
    type Config = PropertyActivationConfig;
    type State = PropertyActivationState;

    fn type_name(&self) -> &'static str {
        "akamai_property_activation"
    }

    async fn plan(
        &self,
        _ctx: &OperationContext,
        _prior: Option<&PropertyActivationState>,
        config: &PropertyActivationConfig,
    ) -> ProviderResult<Diagnostics> {
        config.ensure_valid()?;
        let (_, diagnostics) =
            build_activation_request(&config.settings(), ActivationType::Activate)
                .map_err(into_provider_error)?;
        Ok(diagnostics)
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        config: &PropertyActivationConfig,
    ) -> ProviderResult<Applied<PropertyActivationState>> {
        let timeout = config.timeouts.create_or(self.default_timeout);
        self.activate(ctx, config, timeout).await
    }

    async fn read(
        &self,
        _ctx: &OperationContext,
        state: &PropertyActivationState,
    ) -> ProviderResult<Option<PropertyActivationState>> {
        let target = self.target(state.property());
        let current = current_activation(&target, state.network).await?;
        Ok(current.map(|record| state.refreshed(&record)))
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &PropertyActivationState,
        config: &PropertyActivationConfig,
    ) -> ProviderResult<Applied<PropertyActivationState>> {
        if config.property().property_id != prior.property_id || config.network != prior.network {
            return Err(ProviderError::validation(format!(
                "changing property_id or network of {} requires replacing the resource",
                prior.id()
            )));
        }
        let timeout = config.timeouts.update_or(self.default_timeout);
        self.activate(ctx, config, timeout).await
    }

    async fn delete(
        &self,
        ctx: &OperationContext,
        state: &PropertyActivationState,
    ) -> ProviderResult<Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let target = self.target(state.property());

        let current = match current_activation(&target, state.network).await? {
            Some(record) => record,
            None => {
                log::info!("{}: nothing active, skipping deactivation", state.id());
                return Ok(diagnostics);
            }
        };
        if current.version() != state.version {
            diagnostics.warning(
                format!(
                    "version {} is no longer active on {}",
                    state.version, state.network
                ),
                Some(format!(
                    "version {} is active instead and was left in place",
                    current.version()
                )),
            );
            return Ok(diagnostics);
        }

        let settings = ActivationSettings {
            version: state.version,
            network: state.network,
            note: state.note.as_deref(),
            notify_emails: &state.contact,
            acknowledge_all_warnings: state.auto_acknowledge_rule_warnings,
            compliance_record: state.compliance_record.as_ref(),
        };
        let (request, warnings) = build_activation_request(&settings, ActivationType::Deactivate)
            .map_err(into_provider_error)?;
        diagnostics.extend(warnings);

        let ctx = ctx.with_timeout(state.timeouts.delete_or(self.default_timeout));
        apply_activation(&ctx, &target, &request, self.poll).await?;
        Ok(diagnostics)
    }

    async fn import(
        &self,
        _ctx: &OperationContext,
        id: &str,
    ) -> ProviderResult<PropertyActivationState> {
        let parts = split_id(id, ':', 2, "propertyID:network")
            .map_err(|e| ProviderError::validation(e.to_string()))?;
        let network: Network = parts[1].parse().map_err(ProviderError::validation)?;
        let property = PropertyRef::new(parts[0].as_str());

        let activations = self.api.list_property_activations(&property).await?;
        let record = find_latest_activation(&activations, network).map_err(|e| match e {
            LookupError::NoCurrentActivation(_) => ProviderError::not_found(format!(
                "property {} has no active version on {}",
                property.property_id, network
            )),
            other => other.into(),
        })?;

        Ok(PropertyActivationState {
            property_id: property.property_id.clone(),
            contract_id: None,
            group_id: None,
            network,
            version: record.version(),
            activation_id: record.activation_id.clone(),
            status: record.status.clone(),
            contact: record.notify_emails.clone(),
            note: record.note.clone(),
            auto_acknowledge_rule_warnings: true,
            compliance_record: None,
            timeouts: Timeouts::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyActivationQuery {
    pub property_id: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub network: Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyActivationOutput {
    pub property_id: String,
    pub network: Network,
    pub version: u32,
    pub activation_id: String,
    pub status: ActivationStatus,
    pub contact: Vec<String>,
    pub note: Option<String>,
}

/// Reports which version is active on a network
pub struct PropertyActivationDataSource {
    api: Arc<dyn PapiApi>,
}

impl PropertyActivationDataSource {
    pub fn new(api: Arc<dyn PapiApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for PropertyActivationDataSource {
    type Query = PropertyActivationQuery;
    type Output = PropertyActivationOutput;

    fn type_name(&self) -> &'static str {
        "akamai_property_activation"
    }

    async fn read(
        &self,
        _ctx: &OperationContext,
        query: &PropertyActivationQuery,
    ) -> ProviderResult<PropertyActivationOutput> {
        let property = PropertyRef::new(query.property_id.as_str())
            .with_contract(query.contract_id.clone(), query.group_id.clone());
        let activations = self.api.list_property_activations(&property).await?;
        let record = find_latest_activation(&activations, query.network)?;
        Ok(PropertyActivationOutput {
            property_id: property.property_id.clone(),
            network: record.network,
            version: record.version(),
            activation_id: record.activation_id.clone(),
            status: record.status.clone(),
            contact: record.notify_emails.clone(),
            note: record.note.clone(),
        })
    }
}
