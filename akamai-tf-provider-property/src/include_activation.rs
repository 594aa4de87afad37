//! akamai_property_include_activation resource

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use akamai_tf_core::poll::PollOptions;
use akamai_tf_core::provider::{Applied, Identified, ResourceHandler};
use akamai_tf_core::resource::{Timeouts, join_id, split_id};
use akamai_tf_core::validation::{
    Validate, ValidationError, into_provider_error, require_non_empty,
};
use akamai_tf_core::{Diagnostics, OperationContext, ProviderError, ProviderResult};

use crate::activation::{ActivationTarget, apply_activation, current_activation};
use crate::api::PapiApi;
use crate::compliance::ComplianceRecord;
use crate::models::{
    ActivationRecord, ActivationStatus, ActivationType, IncludeActivation, IncludeRef, Network,
};
use crate::property_activation::{DEFAULT_TIMEOUT, default_poll_options, default_true};
use crate::request::{ActivationRequest, ActivationSettings, build_activation_request};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeActivationConfig {
    pub include_id: String,
    pub contract_id: String,
    pub group_id: String,
    pub version: u32,
    #[serde(default)]
    pub network: Network,
    pub notify_emails: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default = "default_true")]
    pub auto_acknowledge_rule_warnings: bool,
    #[serde(default)]
    pub compliance_record: Option<ComplianceRecord>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl IncludeActivationConfig {
    pub fn include(&self) -> IncludeRef {
        IncludeRef::new(
            self.include_id.as_str(),
            self.contract_id.as_str(),
            self.group_id.as_str(),
        )
    }

    fn settings(&self) -> ActivationSettings<'_> {
        ActivationSettings {
            version: self.version,
            network: self.network,
            note: self.note.as_deref(),
            notify_emails: &self.notify_emails,
            acknowledge_all_warnings: self.auto_acknowledge_rule_warnings,
            compliance_record: self.compliance_record.as_ref(),
        }
    }
}

impl Validate for IncludeActivationConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        require_non_empty("include_id", &self.include_id, &mut errors);
        require_non_empty("contract_id", &self.contract_id, &mut errors);
        require_non_empty("group_id", &self.group_id, &mut errors);
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
pub struct IncludeActivationState {
    pub include_id: String,
    pub contract_id: String,
    pub group_id: String,
    pub network: Network,
    pub version: u32,
    pub activation_id: String,
    pub status: ActivationStatus,
    pub notify_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default = "default_true")]
    pub auto_acknowledge_rule_warnings: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_record: Option<ComplianceRecord>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl IncludeActivationState {
    fn include(&self) -> IncludeRef {
        IncludeRef::new(
            self.include_id.as_str(),
            self.contract_id.as_str(),
            self.group_id.as_str(),
        )
    }
}

impl Identified for IncludeActivationState {
    fn id(&self) -> String {
        join_id(
            &[
                &self.contract_id,
                &self.group_id,
                &self.include_id,
                self.network.as_str(),
            ],
            ':',
        )
    }
}

/// Activation calls for one include
pub struct IncludeTarget {
    api: Arc<dyn PapiApi>,
    include: IncludeRef,
}

impl IncludeTarget {
    pub fn new(api: Arc<dyn PapiApi>, include: IncludeRef) -> Self {
        Self { api, include }
    }
}

#[async_trait]
impl ActivationTarget for IncludeTarget {
    type Record = IncludeActivation;

    fn describe(&self) -> String {
        format!("include {}", self.include.include_id)
    }

    async fn list(&self) -> ProviderResult<Vec<IncludeActivation>> {
        self.api.list_include_activations(&self.include).await
    }

    async fn submit(&self, request: &ActivationRequest) -> ProviderResult<String> {
        self.api
            .create_include_activation(&self.include, request)
            .await
    }

    async fn fetch(&self, activation_id: &str) -> ProviderResult<Option<IncludeActivation>> {
        self.api
            .get_include_activation(&self.include, activation_id)
            .await
    }
}

pub struct IncludeActivationResource {
    api: Arc<dyn PapiApi>,
    poll: PollOptions,
    default_timeout: Duration,
}

impl IncludeActivationResource {
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

    async fn activate(
        &self,
        ctx: &OperationContext,
        config: &IncludeActivationConfig,
        timeout: Duration,
    ) -> ProviderResult<Applied<IncludeActivationState>> {
        config.ensure_valid()?;
        let (request, diagnostics) =
            build_activation_request(&config.settings(), ActivationType::Activate)
                .map_err(into_provider_error)?;

        let include = config.include();
        let target = IncludeTarget::new(self.api.clone(), include.clone());
        let record =
            apply_activation(&ctx.with_timeout(timeout), &target, &request, self.poll).await?;

        let state = IncludeActivationState {
            include_id: include.include_id,
            contract_id: include.contract_id,
            group_id: include.group_id,
            network: record.network,
            version: record.version(),
            activation_id: record.activation_id.clone(),
            status: record.status.clone(),
            notify_emails: config.notify_emails.clone(),
            note: config.note.clone(),
            auto_acknowledge_rule_warnings: config.auto_acknowledge_rule_warnings,
            compliance_record: config.compliance_record.clone(),
            timeouts: config.timeouts,
        };
        Ok(Applied::new(state).with_diagnostics(diagnostics))
    }
}

#[async_trait]
impl ResourceHandler for IncludeActivationResource {
    type Config = IncludeActivationConfig;
    type State = IncludeActivationState;

    fn type_name(&self) -> &'static str {
        "akamai_property_include_activation"
    }

    async fn plan(
        &self,
        _ctx: &OperationContext,
        _prior: Option<&IncludeActivationState>,
        config: &IncludeActivationConfig,
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
        config: &IncludeActivationConfig,
    ) -> ProviderResult<Applied<IncludeActivationState>> {
        let timeout = config.timeouts.create_or(self.default_timeout);
        self.activate(ctx, config, timeout).await
    }

    async fn read(
        &self,
        _ctx: &OperationContext,
        state: &IncludeActivationState,
    ) -> ProviderResult<Option<IncludeActivationState>> {
        let target = IncludeTarget::new(self.api.clone(), state.include());
        let current = current_activation(&target, state.network).await?;
        Ok(current.map(|record| IncludeActivationState {
            version: record.version(),
            activation_id: record.activation_id.clone(),
            status: record.status.clone(),
            ..state.clone()
        }))
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &IncludeActivationState,
        config: &IncludeActivationConfig,
    ) -> ProviderResult<Applied<IncludeActivationState>> {
        if config.include() != prior.include() || config.network != prior.network {
            return Err(ProviderError::validation(format!(
                "changing the include, contract, group or network of {} requires replacing the resource",
                prior.id()
            )));
        }
        let timeout = config.timeouts.update_or(self.default_timeout);
        self.activate(ctx, config, timeout).await
    }

    async fn delete(
        &self,
        ctx: &OperationContext,
        state: &IncludeActivationState,
    ) -> ProviderResult<Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let target = IncludeTarget::new(self.api.clone(), state.include());

        let Some(current) = current_activation(&target, state.network).await? else {
            log::info!("{}: nothing active, skipping deactivation", state.id());
            return Ok(diagnostics);
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
            notify_emails: &state.notify_emails,
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
    ) -> ProviderResult<IncludeActivationState> {
        let parts = split_id(id, ':', 4, "contractID:groupID:includeID:network")
            .map_err(|e| ProviderError::validation(e.to_string()))?;
        let network: Network = parts[3].parse().map_err(ProviderError::validation)?;
        let include = IncludeRef::new(parts[2].as_str(), parts[0].as_str(), parts[1].as_str());

        let target = IncludeTarget::new(self.api.clone(), include.clone());
        let record = current_activation(&target, network).await?.ok_or_else(|| {
            ProviderError::not_found(format!(
                "include {} has no active version on {}",
                include.include_id, network
            ))
        })?;

        Ok(IncludeActivationState {
            include_id: include.include_id,
            contract_id: include.contract_id,
            group_id: include.group_id,
            network,
            version: record.version(),
            activation_id: record.activation_id.clone(),
            status: record.status.clone(),
            notify_emails: record.notify_emails.clone(),
            note: record.note.clone(),
            auto_acknowledge_rule_warnings: true,
            compliance_record: None,
            timeouts: Timeouts::default(),
        })
    }
}
